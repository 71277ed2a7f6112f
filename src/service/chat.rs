//! Conversations and messages
//!
//! A one-to-one conversation is keyed by both participant ids, sorted and
//! joined with `_`, so either side opening it lands on the same record.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::backfill::ProfileLookup;
use crate::data::{
    Conversation, Direction, DocumentStore, Message, Patch, Query, WriteBatch, collections,
    encode, timestamp,
};
use crate::error::AppError;
use crate::metrics::MESSAGES_SENT_TOTAL;

const ID_SEPARATOR: char = '_';

/// Deterministic conversation id for two participants
pub fn conversation_id(a: &str, b: &str) -> String {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    format!("{first}{ID_SEPARATOR}{second}")
}

/// The other participant as shown in the conversation list
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherUser {
    pub user_id: String,
    pub username: String,
    pub avatar: String,
}

/// Conversation list entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub chat_id: String,
    pub last_message: String,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    pub other_user: OtherUser,
}

/// Chat service
pub struct ChatService {
    store: Arc<dyn DocumentStore>,
}

impl ChatService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn load(&self, chat_id: &str) -> Result<Option<Conversation>, AppError> {
        match self.store.get(collections::CHATS, chat_id).await? {
            Some(document) => Ok(Some(document.decode()?)),
            None => Ok(None),
        }
    }

    /// Existing conversation between the two users, created if absent
    ///
    /// # Returns
    /// The conversation and whether this call created it
    pub async fn get_or_create(
        &self,
        user_id: &str,
        other_id: &str,
    ) -> Result<(Conversation, bool), AppError> {
        if other_id.trim().is_empty() {
            return Err(AppError::validation("receiverId is required"));
        }
        if user_id == other_id {
            return Err(AppError::validation("you cannot start a chat with yourself"));
        }
        if user_id.contains(ID_SEPARATOR) || other_id.contains(ID_SEPARATOR) {
            return Err(AppError::validation("user ids must not contain '_'"));
        }

        let chat_id = conversation_id(user_id, other_id);
        if let Some(existing) = self.load(&chat_id).await? {
            return Ok((existing, false));
        }

        let now = timestamp::now();
        let mut members = vec![user_id.to_string(), other_id.to_string()];
        members.sort();
        let conversation = Conversation {
            id: chat_id.clone(),
            members,
            last_message: String::new(),
            created_at: now,
            updated_at: now,
        };

        let mut batch = WriteBatch::new();
        batch.create(collections::CHATS, &chat_id, encode(&conversation)?);
        match self.store.commit(batch).await {
            Ok(()) => {
                tracing::info!(chat_id = %chat_id, "Conversation created");
                Ok((conversation, true))
            }
            // Both sides opened the chat at once; the other request won.
            Err(AppError::Conflict(_)) => {
                let existing = self
                    .load(&chat_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("conversation not found"))?;
                Ok((existing, false))
            }
            Err(error) => Err(error),
        }
    }

    /// Append a message and refresh the conversation summary atomically
    ///
    /// # Errors
    /// `Validation` for empty text, `NotFound` for a missing conversation,
    /// `Forbidden` when the sender is not a member
    pub async fn send_message(
        &self,
        chat_id: &str,
        sender_id: &str,
        text: &str,
    ) -> Result<Message, AppError> {
        if chat_id.trim().is_empty() {
            return Err(AppError::validation("chatId is required"));
        }
        if text.trim().is_empty() {
            return Err(AppError::validation("message text cannot be empty"));
        }

        let conversation = self
            .load(chat_id)
            .await?
            .ok_or_else(|| AppError::not_found("conversation not found"))?;
        if !conversation.is_member(sender_id) {
            return Err(AppError::forbidden("not a member of this conversation"));
        }

        let now = timestamp::now();
        let message = Message {
            id: crate::data::EntityId::new().0,
            chat_id: chat_id.to_string(),
            sender_id: sender_id.to_string(),
            text: text.to_string(),
            created_at: now,
        };

        let mut batch = WriteBatch::new();
        batch
            .create(collections::MESSAGES, &message.id, encode(&message)?)
            .update(
                collections::CHATS,
                chat_id,
                Patch::new()
                    .set("lastMessage", text)
                    .set("updatedAt", timestamp::format(&now)),
            );
        self.store.commit(batch).await?;

        MESSAGES_SENT_TOTAL.inc();
        tracing::debug!(chat_id, message_id = %message.id, "Message sent");
        Ok(message)
    }

    /// Messages oldest first; only members may read them
    pub async fn list_messages(
        &self,
        chat_id: &str,
        requester_id: &str,
    ) -> Result<Vec<Message>, AppError> {
        let member = self
            .load(chat_id)
            .await?
            .is_some_and(|conversation| conversation.is_member(requester_id));
        if !member {
            return Err(AppError::forbidden(
                "you are not allowed to view this conversation",
            ));
        }

        self.store
            .query(
                &Query::collection(collections::MESSAGES)
                    .where_eq("chatId", chat_id)
                    .order_by("createdAt", Direction::Ascending),
            )
            .await?
            .into_iter()
            .map(|document| document.decode())
            .collect()
    }

    /// Conversations of `user_id`, most recently active first
    pub async fn list_conversations(
        &self,
        user_id: &str,
    ) -> Result<Vec<ConversationSummary>, AppError> {
        let conversations = self
            .store
            .query(
                &Query::collection(collections::CHATS)
                    .array_contains("members", user_id)
                    .order_by("updatedAt", Direction::Descending),
            )
            .await?;

        let mut lookup = ProfileLookup::new(self.store.clone());
        let mut summaries = Vec::with_capacity(conversations.len());
        for document in conversations {
            let conversation: Conversation = document.decode()?;
            let other_id = conversation
                .members
                .iter()
                .find(|member| member.as_str() != user_id)
                .cloned()
                .unwrap_or_default();
            let profile = lookup.display(&other_id).await?;

            summaries.push(ConversationSummary {
                chat_id: conversation.id,
                last_message: conversation.last_message,
                updated_at: conversation.updated_at,
                other_user: OtherUser {
                    user_id: other_id,
                    username: profile.username,
                    avatar: profile.avatar,
                },
            });
        }
        Ok(summaries)
    }
}
