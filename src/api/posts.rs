//! Post and comment endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
};

use super::dto::{
    ActionResponse, CommentCountResponse, CommentRequest, CommentResponse, PostResponse,
};
use super::extract::JsonBody;
use super::upload::{MediaKind, read_upload};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::service::{CommentView, PostService};

fn service(state: &AppState) -> PostService {
    PostService::new(state.store.clone(), state.media.clone())
}

/// POST /api/posts/upload
///
/// Multipart form with an `image` file and an optional `caption`.
pub async fn upload_post(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<PostResponse>), AppError> {
    let form = read_upload(multipart, MediaKind::Image).await?;
    let post = service(&state)
        .create_post(&user.user_id, form.media, &form.caption)
        .await?;
    Ok((StatusCode::CREATED, Json(post.into())))
}

/// GET /api/posts/:id
///
/// `id` is the author's user id.
pub async fn posts_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<PostResponse>>, AppError> {
    let posts = service(&state).posts_by_user(&user_id).await?;
    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}

/// DELETE /api/posts/:id
///
/// Removes the post together with its comments and likes.
pub async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    service(&state).delete_post(&post_id, &user.user_id).await?;
    Ok(Json(ActionResponse::ok("Post deleted")))
}

/// POST /api/comment
pub async fn add_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody<CommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), AppError> {
    let comment = service(&state)
        .add_comment(&user.user_id, &body.post_id, &body.comment_text)
        .await?;
    Ok((StatusCode::CREATED, Json(comment.into())))
}

/// GET /api/comments/:postId
pub async fn comments_for(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<CommentView>>, AppError> {
    Ok(Json(service(&state).comments_for(&post_id).await?))
}

/// GET /api/comments/count/:postId
pub async fn comment_count(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<CommentCountResponse>, AppError> {
    let comment_count = service(&state).comment_count(&post_id).await?;
    Ok(Json(CommentCountResponse {
        post_id,
        comment_count,
    }))
}

/// DELETE /api/comments/delete/:commentId
pub async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(comment_id): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    service(&state)
        .delete_comment(&comment_id, &user.user_id)
        .await?;
    Ok(Json(ActionResponse::ok("Comment deleted")))
}
