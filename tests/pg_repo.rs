#![cfg(feature = "postgres-store")]

use quill::models::{NewComment, NewPost, User};
use quill::repo::pg::PgRepo;
use quill::repo::{CommentRepo, CommentScope, PostRepo, RepoError, UserRepo};
use sqlx::postgres::PgPoolOptions;

async fn repo() -> Option<PgRepo> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await
        .ok()?;
    sqlx::migrate!("./migrations").run(&pool).await.ok()?;
    Some(PgRepo::new(pool))
}

fn new_post() -> NewPost {
    NewPost {
        title: format!("pg-{}", uuid::Uuid::new_v4()),
        content: "body".into(),
        published: true,
        category_id: None,
        series_id: None,
        order_in_series: None,
    }
}

#[tokio::test]
#[serial_test::serial]
async fn comment_lifecycle_against_postgres() {
    let Some(r) = repo().await else {
        eprintln!("skip: no DATABASE_URL");
        return;
    };
    let author = format!("pg-user-{}", uuid::Uuid::new_v4());
    r.upsert_user(User { id: author.clone(), name: Some("Pg".into()), image: None }).await.unwrap();
    assert_eq!(r.get_user(&author).await.unwrap().name.as_deref(), Some("Pg"));
    let post = r.create_post(new_post()).await.unwrap();

    let root = r
        .create_comment(NewComment { content: "root".into(), post_id: post.id, parent_id: None, author_id: author.clone() })
        .await
        .unwrap();
    assert_eq!(root.author.name.as_deref(), Some("Pg"));
    let reply = r
        .create_comment(NewComment { content: "re".into(), post_id: post.id, parent_id: Some(root.id), author_id: author.clone() })
        .await
        .unwrap();

    let top = r.list_comments(CommentScope::Post(post.id), None, 10).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].reply_count, 1);

    let replies = r.list_comments(CommentScope::Replies(root.id), None, 10).await.unwrap();
    assert_eq!(replies.iter().map(|c| c.id).collect::<Vec<_>>(), vec![reply.id]);

    let after = r.list_comments(CommentScope::Post(post.id), Some(root.id), 10).await.unwrap();
    assert!(after.is_empty());
    let unknown = r
        .list_comments(CommentScope::Post(post.id), Some(uuid::Uuid::new_v4()), 10)
        .await
        .unwrap();
    assert!(unknown.is_empty());

    let err = r.update_comment_content(root.id, "someone-else", "x".into()).await.unwrap_err();
    assert!(matches!(err, RepoError::NotFound));
    let updated = r.update_comment_content(root.id, &author, "edited".into()).await.unwrap();
    assert_eq!(updated.content, "edited");

    assert!(matches!(r.delete_comment(root.id, "someone-else").await, Err(RepoError::NotFound)));
    r.delete_comment(root.id, &author).await.unwrap();
    assert!(matches!(r.get_comment(reply.id).await, Err(RepoError::NotFound)));
}
