//! User profile endpoints

use axum::{
    extract::{Path, State},
    response::Json,
};

use super::dto::UpdateProfileRequest;
use super::extract::JsonBody;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::service::{ProfileUpdate, ProfileView, UserListEntry, UserService};

/// GET /api/users/:userId
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ProfileView>, AppError> {
    Ok(Json(
        UserService::new(state.store.clone())
            .get_profile(&user_id)
            .await?,
    ))
}

/// PUT /api/users/update/:userId
///
/// Omitted fields are left unchanged. `denormalize` (default true) also
/// refreshes the username and avatar copied onto the user's posts and videos.
pub async fn update_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<String>,
    JsonBody(body): JsonBody<UpdateProfileRequest>,
) -> Result<Json<ProfileView>, AppError> {
    let update = ProfileUpdate {
        username: body.username,
        fullname: body.fullname,
        bio: body.bio,
        avatar: body.avatar,
        denormalize: body.denormalize.unwrap_or(true),
    };
    let profile = UserService::new(state.store.clone())
        .update_profile(&user.user_id, &user_id, update)
        .await?;
    Ok(Json(profile))
}

/// GET /api/users/all/:currentUserId
pub async fn list_users(
    State(state): State<AppState>,
    Path(current_user_id): Path<String>,
) -> Result<Json<Vec<UserListEntry>>, AppError> {
    Ok(Json(
        UserService::new(state.store.clone())
            .list_all(&current_user_id)
            .await?,
    ))
}
