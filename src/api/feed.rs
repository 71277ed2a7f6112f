//! Home feed endpoint

use axum::{
    extract::{Path, Query, State},
    response::Json,
};

use super::dto::{FeedParams, FeedResponse};
use crate::AppState;
use crate::error::AppError;
use crate::service::FeedAssembler;

/// GET /api/profile/feed/:userId
///
/// Posts by the users `userId` follows, newest first. Pass the returned
/// `nextCursor` back as `cursor` for the following page.
pub async fn home_feed(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<FeedParams>,
) -> Result<Json<FeedResponse>, AppError> {
    let page = FeedAssembler::new(state.store.clone(), state.config.feed.clone())
        .home_feed(&user_id, params.limit, params.cursor.as_deref())
        .await?;
    Ok(Json(page.into()))
}
