use std::sync::Arc;

use crate::auth::Identity;
use crate::error::ApiError;
use crate::models::*;
use crate::repo::{CommentScope, Repo, RepoError};

pub const DEFAULT_PAGE_LIMIT: usize = 10;
pub const MAX_PAGE_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default: usize,
    pub max: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self { default: DEFAULT_PAGE_LIMIT, max: MAX_PAGE_LIMIT }
    }
}

/// Comment use-cases. Stateless apart from the repository handle; every
/// call receives the caller's identity explicitly.
#[derive(Clone)]
pub struct CommentService {
    repo: Arc<dyn Repo>,
    limits: PageLimits,
}

impl CommentService {
    pub fn new(repo: Arc<dyn Repo>, limits: PageLimits) -> Self {
        Self { repo, limits }
    }

    pub async fn list(&self, query: ListCommentsQuery) -> Result<CommentPage, ApiError> {
        let scope = match (query.post_id, non_blank(query.parent_id)) {
            (Some(post_id), None) => Some(CommentScope::Post(post_id)),
            (None, Some(raw)) => parse_id(&raw).map(CommentScope::Replies),
            (None, None) => return Err(ApiError::bad_request("Post ID or Parent ID is required")),
            (Some(_), Some(_)) => {
                return Err(ApiError::bad_request("Only one of Post ID or Parent ID may be given"))
            }
        };
        let limit = self.page_limit(query.limit)?;
        // ids that cannot name a comment match nothing
        let cursor = match non_blank(query.cursor) {
            Some(raw) => match parse_id(&raw) {
                Some(id) => Some(id),
                None => return Ok(CommentPage::empty()),
            },
            None => None,
        };
        let Some(scope) = scope else {
            return Ok(CommentPage::empty());
        };
        let comments = self
            .repo
            .list_comments(scope, cursor, limit)
            .await
            .map_err(|e| internal("listing comments", e))?;
        // A full page is taken to mean there may be more; a page that ends
        // exactly on the last record costs the client one empty fetch.
        let next_cursor = if comments.len() == limit {
            comments.last().map(|c| c.id)
        } else {
            None
        };
        Ok(CommentPage { comments, next_cursor })
    }

    pub async fn create(
        &self,
        who: Option<&Identity>,
        req: CreateCommentRequest,
    ) -> Result<CommentView, ApiError> {
        let who = who.ok_or(ApiError::Unauthorized)?;
        let (content, post_id) = match (non_blank(req.content), req.post_id) {
            (Some(content), Some(post_id)) => (content, post_id),
            _ => return Err(ApiError::bad_request("Content and postId are required")),
        };

        match self.repo.get_post(post_id).await {
            Ok(_) => {}
            Err(RepoError::NotFound) => return Err(ApiError::bad_request("Post does not exist")),
            Err(e) => return Err(internal("loading post", e)),
        }
        let parent_id = match non_blank(req.parent_id) {
            Some(raw) => Some(
                parse_id(&raw).ok_or_else(|| ApiError::bad_request("Parent comment does not exist"))?,
            ),
            None => None,
        };
        if let Some(parent_id) = parent_id {
            match self.repo.get_comment(parent_id).await {
                Ok(parent) if parent.post_id == post_id => {}
                Ok(_) => return Err(ApiError::bad_request("Parent comment belongs to another post")),
                Err(RepoError::NotFound) => {
                    return Err(ApiError::bad_request("Parent comment does not exist"))
                }
                Err(e) => return Err(internal("loading parent comment", e)),
            }
        }

        let created = self
            .repo
            .create_comment(NewComment {
                content,
                post_id,
                parent_id,
                author_id: who.user_id.clone(),
            })
            .await
            .map_err(|e| match e {
                // the post or parent went away after the checks above
                RepoError::NotFound if parent_id.is_some() => {
                    ApiError::bad_request("Parent comment does not exist")
                }
                RepoError::NotFound => ApiError::bad_request("Post does not exist"),
                other => internal("creating comment", other),
            })?;
        tracing::info!(comment_id = %created.id, post_id, author = %who.user_id, "comment created");
        Ok(created)
    }

    pub async fn update(
        &self,
        who: Option<&Identity>,
        req: UpdateCommentRequest,
    ) -> Result<CommentView, ApiError> {
        let who = who.ok_or(ApiError::Unauthorized)?;
        let (raw, content) = match (non_blank(req.id), non_blank(req.content)) {
            (Some(raw), Some(content)) => (raw, content),
            _ => return Err(ApiError::bad_request("Comment ID and content are required")),
        };
        let id = owned_id(&raw, "updating comment", who)?;
        self.repo
            .update_comment_content(id, &who.user_id, content)
            .await
            .map_err(|e| denied_or_internal("updating comment", id, who, e))
    }

    pub async fn delete(
        &self,
        who: Option<&Identity>,
        id: Option<String>,
    ) -> Result<MessageResponse, ApiError> {
        let who = who.ok_or(ApiError::Unauthorized)?;
        let raw = non_blank(id).ok_or_else(|| ApiError::bad_request("Comment ID is required"))?;
        let id = owned_id(&raw, "deleting comment", who)?;
        self.repo
            .delete_comment(id, &who.user_id)
            .await
            .map_err(|e| denied_or_internal("deleting comment", id, who, e))?;
        tracing::info!(comment_id = %id, author = %who.user_id, "comment deleted");
        Ok(MessageResponse { message: "Comment deleted successfully".into() })
    }

    fn page_limit(&self, requested: Option<i64>) -> Result<usize, ApiError> {
        match requested {
            None => Ok(self.limits.default),
            Some(n) if n >= 1 && n as u64 <= self.limits.max as u64 => Ok(n as usize),
            Some(_) => Err(ApiError::bad_request(format!(
                "limit must be between 1 and {}",
                self.limits.max
            ))),
        }
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|c| !c.trim().is_empty())
}

fn parse_id(raw: &str) -> Option<CommentId> {
    CommentId::parse_str(raw.trim()).ok()
}

// An id that cannot name a comment is denied like any other missing comment.
fn owned_id(raw: &str, action: &str, who: &Identity) -> Result<CommentId, ApiError> {
    parse_id(raw).ok_or_else(|| {
        tracing::debug!(comment_id = raw, user = %who.user_id, "{action} denied");
        ApiError::Forbidden
    })
}

fn internal(action: &str, e: RepoError) -> ApiError {
    tracing::error!("{action} failed: {e}");
    ApiError::Internal
}

// Missing and not-owned look the same to the caller.
fn denied_or_internal(action: &str, id: CommentId, who: &Identity, e: RepoError) -> ApiError {
    match e {
        RepoError::NotFound => {
            tracing::debug!(comment_id = %id, user = %who.user_id, "{action} denied");
            ApiError::Forbidden
        }
        other => internal(action, other),
    }
}
