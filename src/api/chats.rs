//! Conversation and message endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use super::dto::{
    ChatResponse, CreateChatRequest, MessageResponse, MessageSentResponse, SendMessageRequest,
};
use super::extract::JsonBody;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::service::{ChatService, ConversationSummary};

/// POST /api/chats
///
/// Returns 201 when the conversation was created, 200 when it already existed.
pub async fn get_or_create_chat(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody<CreateChatRequest>,
) -> Result<(StatusCode, Json<ChatResponse>), AppError> {
    let (conversation, created) = ChatService::new(state.store.clone())
        .get_or_create(&user.user_id, &body.receiver_id)
        .await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(conversation.into())))
}

/// GET /api/chats
pub async fn list_chats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ConversationSummary>>, AppError> {
    let chats = ChatService::new(state.store.clone())
        .list_conversations(&user.user_id)
        .await?;
    Ok(Json(chats))
}

/// POST /api/messages/send
pub async fn send_message(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageSentResponse>), AppError> {
    let message = ChatService::new(state.store.clone())
        .send_message(&body.chat_id, &user.user_id, &body.text)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageSentResponse {
            success: true,
            message_id: message.id,
        }),
    ))
}

/// GET /api/messages/:chatId
pub async fn list_messages(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(chat_id): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, AppError> {
    let messages = ChatService::new(state.store.clone())
        .list_messages(&chat_id, &user.user_id)
        .await?;
    Ok(Json(messages.into_iter().map(MessageResponse::from).collect()))
}
