//! Like and bookmark endpoints

use axum::{
    extract::{Path, State},
    response::Json,
};

use super::dto::{ActionResponse, PostIdRequest, SaveRequest};
use super::extract::JsonBody;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::service::{EngagementService, LikedPost, PostLikes, SavedPostView};

/// POST /api/likes/like
pub async fn like(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody<PostIdRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    EngagementService::new(state.store.clone())
        .like(&user.user_id, &body.post_id)
        .await?;
    Ok(Json(ActionResponse::ok("Liked")))
}

/// DELETE /api/likes/unlike
pub async fn unlike(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody<PostIdRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    EngagementService::new(state.store.clone())
        .unlike(&user.user_id, &body.post_id)
        .await?;
    Ok(Json(ActionResponse::ok("Unliked")))
}

/// GET /api/likes/:postId
pub async fn likes_for(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<PostLikes>, AppError> {
    Ok(Json(
        EngagementService::new(state.store.clone())
            .likes_for(&post_id)
            .await?,
    ))
}

/// GET /api/likes/user/:userId
pub async fn liked_posts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<LikedPost>>, AppError> {
    Ok(Json(
        EngagementService::new(state.store.clone())
            .liked_posts(&user_id)
            .await?,
    ))
}

/// POST /api/save
pub async fn save(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody<SaveRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    EngagementService::new(state.store.clone())
        .save(&user.user_id, &body.post_id, &body.image_url)
        .await?;
    Ok(Json(ActionResponse::ok("Post saved")))
}

/// POST /api/unsave
pub async fn unsave(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody<PostIdRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    EngagementService::new(state.store.clone())
        .unsave(&user.user_id, &body.post_id)
        .await?;
    Ok(Json(ActionResponse::ok("Post removed from saved")))
}

/// GET /api/saved-posts
pub async fn saved_posts(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<SavedPostView>>, AppError> {
    Ok(Json(
        EngagementService::new(state.store.clone())
            .saved_posts(&user.user_id)
            .await?,
    ))
}
