use std::sync::Arc;
use actix_web::{web, HttpResponse};

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::*;
use crate::repo::Repo;
use crate::series;
use crate::service::{CommentService, PageLimits};

pub fn config(cfg: &mut web::ServiceConfig) {
    // malformed query strings / bodies share the JSON error shape
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        actix_web::Error::from(ApiError::bad_request(err.to_string()))
    }))
    .app_data(web::JsonConfig::default().error_handler(|err, _req| {
        actix_web::Error::from(ApiError::bad_request(err.to_string()))
    }))
    .service(
        web::scope("/api")
            .service(
                web::resource("/comments")
                    .route(web::get().to(list_comments))
                    .route(web::post().to(create_comment))
                    .route(web::put().to(update_comment))
                    .route(web::delete().to(delete_comment)),
            )
            .service(web::resource("/series-info/{post_id}").route(web::get().to(get_series_info))),
    )
    .route("/healthz", web::get().to(healthz));
}

#[derive(Clone)]
pub struct AppState { pub repo: Arc<dyn Repo>, pub comments: CommentService }

impl AppState {
    pub fn new(repo: Arc<dyn Repo>, limits: PageLimits) -> Self {
        Self { comments: CommentService::new(repo.clone(), limits), repo }
    }
}

#[utoipa::path(
    get,
    path = "/api/comments",
    params(ListCommentsQuery),
    responses(
        (status = 200, description = "Page of comments, newest first", body = CommentPage),
        (status = 400, description = "Neither or both of postId / parentId, or bad limit")
    ),
    tag = "comments"
)]
pub async fn list_comments(
    data: web::Data<AppState>,
    query: web::Query<ListCommentsQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = data.comments.list(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    post,
    path = "/api/comments",
    request_body = CreateCommentRequest,
    responses(
        (status = 200, description = "Comment created", body = CommentView),
        (status = 400, description = "Missing content or postId"),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Persistence failure")
    ),
    tag = "comments"
)]
pub async fn create_comment(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    payload: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse, ApiError> {
    let who = auth.map(|a| a.identity());
    let comment = data.comments.create(who.as_ref(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(comment))
}

#[utoipa::path(
    put,
    path = "/api/comments",
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = CommentView),
        (status = 400, description = "Missing id or content"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the author, or no such comment")
    ),
    tag = "comments"
)]
pub async fn update_comment(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    payload: web::Json<UpdateCommentRequest>,
) -> Result<HttpResponse, ApiError> {
    let who = auth.map(|a| a.identity());
    let comment = data.comments.update(who.as_ref(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(comment))
}

#[utoipa::path(
    delete,
    path = "/api/comments",
    params(DeleteCommentQuery),
    responses(
        (status = 200, description = "Comment and its replies deleted", body = MessageResponse),
        (status = 400, description = "Missing id"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the author, or no such comment")
    ),
    tag = "comments"
)]
pub async fn delete_comment(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    query: web::Query<DeleteCommentQuery>,
) -> Result<HttpResponse, ApiError> {
    let who = auth.map(|a| a.identity());
    let msg = data.comments.delete(who.as_ref(), query.into_inner().id).await?;
    Ok(HttpResponse::Ok().json(msg))
}

#[utoipa::path(
    get,
    path = "/api/series-info/{post_id}",
    params(("post_id" = PostId, Path, description = "Post being read")),
    responses(
        (status = 200, description = "Series navigation for the post", body = series::SeriesInfo),
        (status = 404, description = "Post missing, unpublished or not part of a series")
    ),
    tag = "series"
)]
pub async fn get_series_info(
    data: web::Data<AppState>,
    path: web::Path<PostId>,
) -> Result<HttpResponse, ApiError> {
    let info = series::series_info(data.repo.as_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(info))
}

pub async fn healthz() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}
