//! Notification endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use super::dto::{
    ActionResponse, AddNotificationRequest, NotificationCreatedResponse, NotificationResponse,
};
use super::extract::JsonBody;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::service::{NewNotification, NotificationService};

fn service(state: &AppState) -> NotificationService {
    NotificationService::new(
        state.store.clone(),
        state.config.notifications.list_limit,
    )
}

/// POST /api/notifications/add
pub async fn add_notification(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody<AddNotificationRequest>,
) -> Result<(StatusCode, Json<NotificationCreatedResponse>), AppError> {
    let notification_id = service(&state)
        .add(
            &user.user_id,
            NewNotification {
                receiver_id: body.receiver_id,
                notification_type: body.notification_type,
                post_id: body.post_id,
                message: body.message,
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(NotificationCreatedResponse {
            success: true,
            notification_id,
        }),
    ))
}

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<NotificationResponse>>, AppError> {
    let notifications = service(&state).list(&user.user_id).await?;
    Ok(Json(
        notifications
            .into_iter()
            .map(NotificationResponse::from)
            .collect(),
    ))
}

/// PUT /api/notifications/read/:notificationId
pub async fn mark_read(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(notification_id): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    service(&state)
        .mark_read(&notification_id, &user.user_id)
        .await?;
    Ok(Json(ActionResponse::ok("Notification marked as read")))
}
