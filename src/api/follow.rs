//! Follow graph endpoints

use axum::{
    extract::{Path, State},
    response::Json,
};

use super::dto::{ActionResponse, FollowRequest, FollowingListResponse};
use super::extract::JsonBody;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::service::{DisplayProfile, FollowCounts, RelationshipService};

/// POST /api/follow
pub async fn follow(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody<FollowRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    RelationshipService::new(state.store.clone())
        .follow(&user.user_id, &body.following_id)
        .await?;
    Ok(Json(ActionResponse::ok("Followed")))
}

/// DELETE /api/follow
pub async fn unfollow(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody<FollowRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    RelationshipService::new(state.store.clone())
        .unfollow(&user.user_id, &body.following_id)
        .await?;
    Ok(Json(ActionResponse::ok("Unfollowed")))
}

/// GET /api/follow/:userId
pub async fn counts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<FollowCounts>, AppError> {
    let counts = RelationshipService::new(state.store.clone())
        .counts(&user_id)
        .await?;
    Ok(Json(counts))
}

/// GET /api/follow/check-following/:userId
pub async fn following_ids(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<FollowingListResponse>, AppError> {
    let following_list = RelationshipService::new(state.store.clone())
        .following_ids(&user_id)
        .await?;
    Ok(Json(FollowingListResponse { following_list }))
}

/// GET /api/follow/following/:userId
pub async fn following(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<DisplayProfile>>, AppError> {
    let profiles = RelationshipService::new(state.store.clone())
        .following_profiles(&user_id)
        .await?;
    Ok(Json(profiles))
}

/// GET /api/follow/followers/:userId
pub async fn followers(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<DisplayProfile>>, AppError> {
    let profiles = RelationshipService::new(state.store.clone())
        .follower_profiles(&user_id)
        .await?;
    Ok(Json(profiles))
}
