//! Story endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
};

use super::dto::{ActionResponse, StoryResponse};
use super::upload::{MediaKind, read_upload};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::service::{StoryGroup, StoryService};

/// POST /api/stories/upload
pub async fn upload_story(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<StoryResponse>), AppError> {
    let form = read_upload(multipart, MediaKind::Image).await?;
    let story = StoryService::new(state.store.clone(), state.media.clone())
        .create_story(&user.user_id, form.media)
        .await?;
    Ok((StatusCode::CREATED, Json(story.into())))
}

/// GET /api/stories/list
pub async fn list_stories(
    State(state): State<AppState>,
) -> Result<Json<Vec<StoryGroup>>, AppError> {
    let groups = StoryService::new(state.store.clone(), state.media.clone())
        .grouped_stories()
        .await?;
    Ok(Json(groups))
}

/// POST /api/stories/:storyId/view
pub async fn view_story(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(story_id): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    StoryService::new(state.store.clone(), state.media.clone())
        .mark_viewed(&story_id, &user.user_id)
        .await?;
    Ok(Json(ActionResponse::ok("Story viewed")))
}
