use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub type CommentId = Uuid;
pub type PostId = i64;
pub type SeriesId = i64;
pub type UserId = String;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub content: String,
    pub post_id: PostId,
    pub parent_id: Option<CommentId>, // None = top-level
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload handed to the repository once the service has validated it.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub content: String,
    pub post_id: PostId,
    pub parent_id: Option<CommentId>,
    pub author_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthorSummary {
    pub id: UserId,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// A comment as it goes over the wire: the row plus its author and reply count.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: CommentId,
    pub content: String,
    pub post_id: PostId,
    pub parent_id: Option<CommentId>,
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: AuthorSummary,
    pub reply_count: i64,
}

impl CommentView {
    pub fn new(comment: Comment, author: Option<&User>, reply_count: i64) -> Self {
        let author = match author {
            Some(u) => AuthorSummary { id: u.id.clone(), name: u.name.clone(), image: u.image.clone() },
            None => AuthorSummary { id: comment.author_id.clone(), name: None, image: None },
        };
        Self {
            id: comment.id,
            content: comment.content,
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            author_id: comment.author_id,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
            author,
            reply_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    pub comments: Vec<CommentView>,
    pub next_cursor: Option<CommentId>,
}

impl CommentPage {
    pub fn empty() -> Self {
        Self { comments: Vec::new(), next_cursor: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category_id: Option<i64>,
    pub series_id: Option<SeriesId>,
    pub order_in_series: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub published: bool,
    pub category_id: Option<i64>,
    pub series_id: Option<SeriesId>,
    pub order_in_series: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Series {
    pub id: SeriesId,
    pub title: String,
}

// ---------------- request bodies / query strings ----------------

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListCommentsQuery {
    /// List top-level comments of this post.
    pub post_id: Option<PostId>,
    /// List direct replies to this comment.
    pub parent_id: Option<String>,
    /// Resume after this comment id.
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

// Fields are optional so that absent values surface as validation errors
// from the service rather than as serde rejections. Comment ids arrive as
// opaque strings and are parsed after the caller has been authenticated.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub content: Option<String>,
    pub post_id: Option<PostId>,
    pub parent_id: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct UpdateCommentRequest {
    pub id: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteCommentQuery {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
