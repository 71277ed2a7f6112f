//! Video endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
};

use super::dto::{ActionResponse, VideoListResponse, VideoResponse};
use super::upload::{MediaKind, read_upload};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::service::VideoService;

fn service(state: &AppState) -> VideoService {
    VideoService::new(state.store.clone(), state.media.clone())
}

fn video_list(videos: Vec<crate::data::Video>) -> Json<VideoListResponse> {
    Json(VideoListResponse {
        success: true,
        videos: videos.into_iter().map(VideoResponse::from).collect(),
    })
}

/// POST /api/video/upload
///
/// Multipart form with a `video` file and an optional `caption`.
pub async fn upload_video(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<VideoResponse>), AppError> {
    let form = read_upload(multipart, MediaKind::Video).await?;
    let video = service(&state)
        .create_video(&user.user_id, form.media, &form.caption)
        .await?;
    Ok((StatusCode::CREATED, Json(video.into())))
}

/// GET /api/video/videos
pub async fn all_videos(
    State(state): State<AppState>,
) -> Result<Json<VideoListResponse>, AppError> {
    Ok(video_list(service(&state).all_videos().await?))
}

/// GET /api/video/videos/:userId
pub async fn videos_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<VideoListResponse>, AppError> {
    Ok(video_list(service(&state).videos_by_user(&user_id).await?))
}

/// DELETE /api/video/delete/:videoId
pub async fn delete_video(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(video_id): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    service(&state).delete_video(&video_id, &user.user_id).await?;
    Ok(Json(ActionResponse::ok("Video deleted")))
}
