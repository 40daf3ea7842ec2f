use crate::models::{
    AuthorSummary, CommentPage, CommentView, CreateCommentRequest, MessageResponse, UpdateCommentRequest,
};
use crate::series::{PostLink, SeriesEntry, SeriesInfo};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::list_comments,
        crate::routes::create_comment,
        crate::routes::update_comment,
        crate::routes::delete_comment,
        crate::routes::get_series_info,
    ),
    components(schemas(
        CommentView, CommentPage, AuthorSummary, CreateCommentRequest, UpdateCommentRequest,
        MessageResponse, SeriesInfo, SeriesEntry, PostLink
    )),
    tags(
        (name = "comments", description = "Threaded post comments"),
        (name = "series", description = "Series navigation"),
    )
)]
pub struct ApiDoc;
