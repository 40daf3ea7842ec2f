use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("internal: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Which slice of the comment tree a listing walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentScope {
    /// Top-level comments of a post.
    Post(PostId),
    /// Direct replies to a comment.
    Replies(CommentId),
}

use async_trait::async_trait;

#[async_trait]
pub trait CommentRepo: Send + Sync {
    /// Newest first (`created_at DESC, id DESC`), strictly after `cursor` when
    /// given. An unknown cursor yields an empty page.
    async fn list_comments(
        &self,
        scope: CommentScope,
        cursor: Option<CommentId>,
        limit: usize,
    ) -> RepoResult<Vec<CommentView>>;
    async fn get_comment(&self, id: CommentId) -> RepoResult<Comment>;
    async fn create_comment(&self, new: NewComment) -> RepoResult<CommentView>;
    /// Replace content iff the comment exists and is owned by `author_id`.
    /// Both failure cases report `NotFound`.
    async fn update_comment_content(
        &self,
        id: CommentId,
        author_id: &str,
        content: String,
    ) -> RepoResult<CommentView>;
    /// Delete the comment and every reply below it iff owned by `author_id`.
    async fn delete_comment(&self, id: CommentId, author_id: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn get_post(&self, id: PostId) -> RepoResult<Post>;
    async fn create_post(&self, new: NewPost) -> RepoResult<Post>;
    async fn get_series(&self, id: SeriesId) -> RepoResult<Series>;
    async fn create_series(&self, title: String) -> RepoResult<Series>;
    /// Published posts of a series ordered by `order_in_series`.
    async fn list_series_posts(&self, series_id: SeriesId) -> RepoResult<Vec<Post>>;
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_user(&self, id: &str) -> RepoResult<User>;
    async fn upsert_user(&self, user: User) -> RepoResult<User>;
}

pub trait Repo: CommentRepo + PostRepo + UserRepo {}

impl<T> Repo for T where T: CommentRepo + PostRepo + UserRepo {}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use serde::{Deserialize, Serialize};
    use std::collections::{BTreeSet, HashMap};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

    #[derive(Default, Serialize, Deserialize)]
    struct State {
        users: HashMap<UserId, User>,
        series: HashMap<SeriesId, Series>,
        posts: HashMap<PostId, Post>,
        comments: HashMap<CommentId, Comment>,
        // parent id -> direct reply ids
        children: HashMap<CommentId, BTreeSet<CommentId>>,
        next_id: i64,
        last_created_at: Option<DateTime<Utc>>,
    }

    impl State {
        fn next_id(&mut self) -> i64 {
            self.next_id += 1;
            self.next_id
        }

        // Strictly increasing so that "newest first" is total within the store.
        fn next_created_at(&mut self) -> DateTime<Utc> {
            let mut now = Utc::now();
            if let Some(last) = self.last_created_at {
                if now <= last {
                    now = last + Duration::microseconds(1);
                }
            }
            self.last_created_at = Some(now);
            now
        }

        fn reply_count(&self, id: &CommentId) -> i64 {
            self.children.get(id).map_or(0, |c| c.len() as i64)
        }

        fn view(&self, comment: &Comment) -> CommentView {
            CommentView::new(
                comment.clone(),
                self.users.get(&comment.author_id),
                self.reply_count(&comment.id),
            )
        }

        fn owned_mut(&mut self, id: &CommentId, author_id: &str) -> RepoResult<&mut Comment> {
            match self.comments.get_mut(id) {
                Some(c) if c.author_id == author_id => Ok(c),
                _ => Err(RepoError::NotFound),
            }
        }
    }

    #[derive(Clone, Default)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        snapshot_path: Option<Arc<PathBuf>>,
    }

    impl InMemRepo {
        /// Purely in-memory; nothing survives the process.
        pub fn new() -> Self {
            Self::default()
        }

        /// Load `<dir>/state.json` if present and rewrite it after every mutation.
        pub fn with_snapshot_dir(dir: impl AsRef<Path>) -> Self {
            let path = dir.as_ref().join("state.json");
            let state = Self::load_state_from(&path);
            Self {
                state: Arc::new(RwLock::new(state)),
                snapshot_path: Some(Arc::new(path)),
            }
        }

        fn load_state_from(path: &Path) -> State {
            match std::fs::read(path) {
                Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                    Ok(s) => {
                        log::info!("[inmem] loaded snapshot '{}'", path.display());
                        s
                    }
                    Err(e) => {
                        log::warn!("[inmem] failed to parse snapshot '{}': {e}. Starting empty.", path.display());
                        State::default()
                    }
                },
                Err(e) => {
                    log::info!("[inmem] no snapshot at '{}': {e}. Starting empty.", path.display());
                    State::default()
                }
            }
        }

        fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        // Called with the write lock held so snapshots land in mutation order.
        fn persist(&self, state: &State) {
            let Some(path) = self.snapshot_path.as_deref() else { return };
            let bytes = match serde_json::to_vec_pretty(state) {
                Ok(b) => b,
                Err(e) => {
                    log::error!("[inmem] failed to serialise snapshot: {e}");
                    return;
                }
            };
            if let Some(dir) = path.parent() {
                let _ = std::fs::create_dir_all(dir);
            }
            if let Err(e) = std::fs::write(path, bytes) {
                log::error!("[inmem] failed to write snapshot '{}': {e}", path.display());
            }
        }
    }

    #[async_trait]
    impl CommentRepo for InMemRepo {
        async fn list_comments(
            &self,
            scope: CommentScope,
            cursor: Option<CommentId>,
            limit: usize,
        ) -> RepoResult<Vec<CommentView>> {
            let s = self.read()?;
            let anchor = match cursor {
                Some(id) => match s.comments.get(&id) {
                    Some(c) => Some((c.created_at, c.id)),
                    None => return Ok(Vec::new()),
                },
                None => None,
            };
            let mut page: Vec<&Comment> = match scope {
                CommentScope::Post(post_id) => s
                    .comments
                    .values()
                    .filter(|c| c.post_id == post_id && c.parent_id.is_none())
                    .collect(),
                CommentScope::Replies(parent_id) => s
                    .children
                    .get(&parent_id)
                    .into_iter()
                    .flatten()
                    .filter_map(|id| s.comments.get(id))
                    .collect(),
            };
            if let Some(anchor) = anchor {
                page.retain(|c| (c.created_at, c.id) < anchor);
            }
            page.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id))); // newest first
            page.truncate(limit);
            Ok(page.into_iter().map(|c| s.view(c)).collect())
        }

        async fn get_comment(&self, id: CommentId) -> RepoResult<Comment> {
            let s = self.read()?;
            s.comments.get(&id).cloned().ok_or(RepoError::NotFound)
        }

        async fn create_comment(&self, new: NewComment) -> RepoResult<CommentView> {
            let mut s = self.write()?;
            if !s.posts.contains_key(&new.post_id) {
                return Err(RepoError::NotFound);
            }
            if let Some(parent) = new.parent_id {
                if !s.comments.contains_key(&parent) {
                    return Err(RepoError::NotFound);
                }
            }
            let now = s.next_created_at();
            let comment = Comment {
                id: uuid::Uuid::new_v4(),
                content: new.content,
                post_id: new.post_id,
                parent_id: new.parent_id,
                author_id: new.author_id,
                created_at: now,
                updated_at: now,
            };
            if let Some(parent) = comment.parent_id {
                s.children.entry(parent).or_default().insert(comment.id);
            }
            s.comments.insert(comment.id, comment.clone());
            let view = s.view(&comment);
            self.persist(&s);
            Ok(view)
        }

        async fn update_comment_content(
            &self,
            id: CommentId,
            author_id: &str,
            content: String,
        ) -> RepoResult<CommentView> {
            let mut s = self.write()?;
            let comment = s.owned_mut(&id, author_id)?;
            comment.content = content;
            comment.updated_at = Utc::now();
            let updated = comment.clone();
            let view = s.view(&updated);
            self.persist(&s);
            Ok(view)
        }

        async fn delete_comment(&self, id: CommentId, author_id: &str) -> RepoResult<()> {
            let mut s = self.write()?;
            let parent = s.owned_mut(&id, author_id)?.parent_id;
            if let Some(parent) = parent {
                if let Some(siblings) = s.children.get_mut(&parent) {
                    siblings.remove(&id);
                }
            }
            // cascade through the reply index
            let mut stack = vec![id];
            while let Some(next) = stack.pop() {
                s.comments.remove(&next);
                if let Some(kids) = s.children.remove(&next) {
                    stack.extend(kids);
                }
            }
            self.persist(&s);
            Ok(())
        }
    }

    #[async_trait]
    impl PostRepo for InMemRepo {
        async fn get_post(&self, id: PostId) -> RepoResult<Post> {
            let s = self.read()?;
            s.posts.get(&id).cloned().ok_or(RepoError::NotFound)
        }

        async fn create_post(&self, new: NewPost) -> RepoResult<Post> {
            let mut s = self.write()?;
            if let Some(series_id) = new.series_id {
                if !s.series.contains_key(&series_id) {
                    return Err(RepoError::NotFound);
                }
            }
            let id = s.next_id();
            let now = Utc::now();
            let post = Post {
                id,
                title: new.title,
                content: new.content,
                published: new.published,
                created_at: now,
                updated_at: now,
                category_id: new.category_id,
                series_id: new.series_id,
                order_in_series: new.order_in_series,
            };
            s.posts.insert(id, post.clone());
            self.persist(&s);
            Ok(post)
        }

        async fn get_series(&self, id: SeriesId) -> RepoResult<Series> {
            let s = self.read()?;
            s.series.get(&id).cloned().ok_or(RepoError::NotFound)
        }

        async fn create_series(&self, title: String) -> RepoResult<Series> {
            let mut s = self.write()?;
            let id = s.next_id();
            let series = Series { id, title };
            s.series.insert(id, series.clone());
            self.persist(&s);
            Ok(series)
        }

        async fn list_series_posts(&self, series_id: SeriesId) -> RepoResult<Vec<Post>> {
            let s = self.read()?;
            let mut v: Vec<Post> = s
                .posts
                .values()
                .filter(|p| p.published && p.series_id == Some(series_id))
                .cloned()
                .collect();
            v.sort_by_key(|p| (p.order_in_series.unwrap_or(i32::MAX), p.id));
            Ok(v)
        }
    }

    #[async_trait]
    impl UserRepo for InMemRepo {
        async fn get_user(&self, id: &str) -> RepoResult<User> {
            let s = self.read()?;
            s.users.get(id).cloned().ok_or(RepoError::NotFound)
        }

        async fn upsert_user(&self, user: User) -> RepoResult<User> {
            let mut s = self.write()?;
            s.users.insert(user.id.clone(), user.clone());
            self.persist(&s);
            Ok(user)
        }
    }
}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use chrono::{DateTime, Utc};
    use sqlx::{Pool, Postgres};

    impl From<sqlx::Error> for RepoError {
        fn from(e: sqlx::Error) -> Self {
            match e {
                sqlx::Error::RowNotFound => RepoError::NotFound,
                // referenced post or parent row is gone
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => RepoError::NotFound,
                other => RepoError::Internal(other.to_string()),
            }
        }
    }

    const COMMENT_VIEW_SELECT: &str = r#"
        SELECT c.id, c.content, c.post_id, c.parent_id, c.author_id, c.created_at, c.updated_at,
               u.name AS author_name, u.image AS author_image,
               (SELECT COUNT(*) FROM comments r WHERE r.parent_id = c.id) AS reply_count
        FROM comments c
        LEFT JOIN users u ON u.id = c.author_id
    "#;

    // Row comparison against an empty subquery is NULL, so an unknown cursor
    // filters everything out.
    const CURSOR_AND_ORDER: &str = r#"
        AND ($2::uuid IS NULL OR (c.created_at, c.id) < (SELECT created_at, id FROM comments WHERE id = $2))
        ORDER BY c.created_at DESC, c.id DESC
        LIMIT $3
    "#;

    #[derive(sqlx::FromRow)]
    struct CommentRow {
        id: CommentId,
        content: String,
        post_id: PostId,
        parent_id: Option<CommentId>,
        author_id: UserId,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        author_name: Option<String>,
        author_image: Option<String>,
        reply_count: i64,
    }

    impl From<CommentRow> for CommentView {
        fn from(r: CommentRow) -> Self {
            CommentView {
                author: AuthorSummary { id: r.author_id.clone(), name: r.author_name, image: r.author_image },
                id: r.id,
                content: r.content,
                post_id: r.post_id,
                parent_id: r.parent_id,
                author_id: r.author_id,
                created_at: r.created_at,
                updated_at: r.updated_at,
                reply_count: r.reply_count,
            }
        }
    }

    #[derive(Clone)]
    pub struct PgRepo { pool: Pool<Postgres> }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }

        async fn comment_view(&self, id: CommentId) -> RepoResult<CommentView> {
            let row = sqlx::query_as::<_, CommentRow>(&format!("{COMMENT_VIEW_SELECT} WHERE c.id = $1"))
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
            Ok(row.into())
        }
    }

    #[async_trait]
    impl CommentRepo for PgRepo {
        async fn list_comments(
            &self,
            scope: CommentScope,
            cursor: Option<CommentId>,
            limit: usize,
        ) -> RepoResult<Vec<CommentView>> {
            let filter = match scope {
                CommentScope::Post(_) => "WHERE c.post_id = $1 AND c.parent_id IS NULL",
                CommentScope::Replies(_) => "WHERE c.parent_id = $1",
            };
            let sql = format!("{COMMENT_VIEW_SELECT} {filter} {CURSOR_AND_ORDER}");
            let query = sqlx::query_as::<_, CommentRow>(&sql);
            let query = match scope {
                CommentScope::Post(post_id) => query.bind(post_id),
                CommentScope::Replies(parent_id) => query.bind(parent_id),
            };
            let rows = query
                .bind(cursor)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?;
            Ok(rows.into_iter().map(CommentView::from).collect())
        }

        async fn get_comment(&self, id: CommentId) -> RepoResult<Comment> {
            let rec = sqlx::query_as::<_, Comment>(
                "SELECT id, content, post_id, parent_id, author_id, created_at, updated_at FROM comments WHERE id = $1",
            )
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
            Ok(rec)
        }

        async fn create_comment(&self, new: NewComment) -> RepoResult<CommentView> {
            let id = uuid::Uuid::new_v4();
            sqlx::query(
                "INSERT INTO comments (id, content, post_id, parent_id, author_id) VALUES ($1,$2,$3,$4,$5)",
            )
            .bind(id)
            .bind(&new.content)
            .bind(new.post_id)
            .bind(new.parent_id)
            .bind(&new.author_id)
            .execute(&self.pool)
            .await?;
            self.comment_view(id).await
        }

        async fn update_comment_content(
            &self,
            id: CommentId,
            author_id: &str,
            content: String,
        ) -> RepoResult<CommentView> {
            // ownership check and write in one statement
            let updated = sqlx::query_scalar::<_, CommentId>(
                "UPDATE comments SET content = $3, updated_at = now() WHERE id = $1 AND author_id = $2 RETURNING id",
            )
            .bind(id)
            .bind(author_id)
            .bind(&content)
            .fetch_optional(&self.pool)
            .await?;
            match updated {
                Some(id) => self.comment_view(id).await,
                None => Err(RepoError::NotFound),
            }
        }

        async fn delete_comment(&self, id: CommentId, author_id: &str) -> RepoResult<()> {
            // replies go with it through ON DELETE CASCADE
            let res = sqlx::query("DELETE FROM comments WHERE id = $1 AND author_id = $2")
                .bind(id)
                .bind(author_id)
                .execute(&self.pool)
                .await?;
            if res.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
            Ok(())
        }
    }

    const POST_COLUMNS: &str =
        "id, title, content, published, created_at, updated_at, category_id, series_id, order_in_series";

    #[async_trait]
    impl PostRepo for PgRepo {
        async fn get_post(&self, id: PostId) -> RepoResult<Post> {
            let rec = sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
            Ok(rec)
        }

        async fn create_post(&self, new: NewPost) -> RepoResult<Post> {
            let rec = sqlx::query_as::<_, Post>(&format!(
                "INSERT INTO posts (title, content, published, category_id, series_id, order_in_series) \
                 VALUES ($1,$2,$3,$4,$5,$6) RETURNING {POST_COLUMNS}"
            ))
            .bind(&new.title)
            .bind(&new.content)
            .bind(new.published)
            .bind(new.category_id)
            .bind(new.series_id)
            .bind(new.order_in_series)
            .fetch_one(&self.pool)
            .await?;
            Ok(rec)
        }

        async fn get_series(&self, id: SeriesId) -> RepoResult<Series> {
            let rec = sqlx::query_as::<_, Series>("SELECT id, title FROM series WHERE id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
            Ok(rec)
        }

        async fn create_series(&self, title: String) -> RepoResult<Series> {
            let rec = sqlx::query_as::<_, Series>("INSERT INTO series (title) VALUES ($1) RETURNING id, title")
                .bind(&title)
                .fetch_one(&self.pool)
                .await?;
            Ok(rec)
        }

        async fn list_series_posts(&self, series_id: SeriesId) -> RepoResult<Vec<Post>> {
            let recs = sqlx::query_as::<_, Post>(&format!(
                "SELECT {POST_COLUMNS} FROM posts WHERE series_id = $1 AND published \
                 ORDER BY order_in_series ASC NULLS LAST, id ASC"
            ))
            .bind(series_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(recs)
        }
    }

    #[async_trait]
    impl UserRepo for PgRepo {
        async fn get_user(&self, id: &str) -> RepoResult<User> {
            let rec = sqlx::query_as::<_, User>("SELECT id, name, image FROM users WHERE id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
            Ok(rec)
        }

        async fn upsert_user(&self, user: User) -> RepoResult<User> {
            let rec = sqlx::query_as::<_, User>(
                "INSERT INTO users (id, name, image) VALUES ($1,$2,$3) \
                 ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, image = EXCLUDED.image \
                 RETURNING id, name, image",
            )
            .bind(&user.id)
            .bind(&user.name)
            .bind(&user.image)
            .fetch_one(&self.pool)
            .await?;
            Ok(rec)
        }
    }
}
