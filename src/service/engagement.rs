//! Likes and saved posts
//!
//! Both use the deterministic document id `{userId}_{postId}`, so the store
//! itself rejects a second like of the same post.

use std::sync::Arc;

use serde::Serialize;

use crate::data::{
    DocumentStore, EntityId, Like, Notification, Post, Query, SavedPost, WriteBatch, collections,
    encode, timestamp,
};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostLikes {
    pub like_count: usize,
    /// Ids of the users who liked the post
    pub likes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikedPost {
    pub post_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPostView {
    pub post_id: String,
    pub image_url: String,
}

/// Engagement service
pub struct EngagementService {
    store: Arc<dyn DocumentStore>,
}

/// Post ids are ULIDs; `_` would make `{userId}_{postId}` ambiguous.
fn require_post_id(post_id: &str) -> Result<(), AppError> {
    if post_id.trim().is_empty() {
        return Err(AppError::validation("postId is required"));
    }
    if post_id.contains('_') {
        return Err(AppError::validation("invalid postId"));
    }
    Ok(())
}

impl EngagementService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Like a post; notifies the owner unless they liked their own post
    ///
    /// # Errors
    /// `NotFound` for a missing post, `Conflict` if already liked
    pub async fn like(&self, user_id: &str, post_id: &str) -> Result<(), AppError> {
        require_post_id(post_id)?;
        let post: Post = self
            .store
            .get(collections::POSTS, post_id)
            .await?
            .ok_or_else(|| AppError::not_found("post not found"))?
            .decode()?;

        let now = timestamp::now();
        let like = Like {
            id: String::new(),
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
            liked_at: now,
        };

        let mut batch = WriteBatch::new();
        batch.create(
            collections::LIKES,
            &Like::document_id(user_id, post_id),
            encode(&like)?,
        );
        if post.user_id != user_id {
            let notification = Notification {
                id: String::new(),
                sender_id: user_id.to_string(),
                receiver_id: post.user_id.clone(),
                notification_type: "like".to_string(),
                post_id: Some(post_id.to_string()),
                message: String::new(),
                is_read: false,
                created_at: now,
                sender_name: None,
                sender_avatar: None,
            };
            batch.create(
                collections::NOTIFICATIONS,
                &EntityId::new().0,
                encode(&notification)?,
            );
        }

        self.store
            .commit(batch)
            .await
            .map_err(|error| match error {
                AppError::Conflict(_) => AppError::conflict("you already liked this post"),
                other => other,
            })
    }

    /// # Errors
    /// `Validation` if the post was not liked
    pub async fn unlike(&self, user_id: &str, post_id: &str) -> Result<(), AppError> {
        require_post_id(post_id)?;
        let like_id = Like::document_id(user_id, post_id);
        if self.store.get(collections::LIKES, &like_id).await?.is_none() {
            return Err(AppError::validation("you have not liked this post"));
        }
        self.store.delete(collections::LIKES, &like_id).await
    }

    pub async fn likes_for(&self, post_id: &str) -> Result<PostLikes, AppError> {
        let likes: Vec<String> = self
            .store
            .query(&Query::collection(collections::LIKES).where_eq("postId", post_id))
            .await?
            .into_iter()
            .map(|document| document.decode::<Like>().map(|like| like.user_id))
            .collect::<Result<_, _>>()?;

        Ok(PostLikes {
            like_count: likes.len(),
            likes,
        })
    }

    pub async fn liked_posts(&self, user_id: &str) -> Result<Vec<LikedPost>, AppError> {
        self.store
            .query(&Query::collection(collections::LIKES).where_eq("userId", user_id))
            .await?
            .into_iter()
            .map(|document| {
                document
                    .decode::<Like>()
                    .map(|like| LikedPost { post_id: like.post_id })
            })
            .collect()
    }

    // =========================================================================
    // Saved posts
    // =========================================================================

    /// Bookmark a post; saving again refreshes the bookmark
    ///
    /// # Errors
    /// `NotFound` for a missing post
    pub async fn save(&self, user_id: &str, post_id: &str, image_url: &str) -> Result<(), AppError> {
        if image_url.trim().is_empty() {
            return Err(AppError::validation("postId and imageUrl are required"));
        }
        require_post_id(post_id)?;
        if self.store.get(collections::POSTS, post_id).await?.is_none() {
            return Err(AppError::not_found("post not found"));
        }

        let saved = SavedPost {
            id: String::new(),
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
            image_url: image_url.to_string(),
            saved_at: timestamp::now(),
        };
        self.store
            .set(
                collections::SAVED_POSTS,
                &SavedPost::document_id(user_id, post_id),
                encode(&saved)?,
            )
            .await
    }

    /// # Errors
    /// `NotFound` if the post was not saved
    pub async fn unsave(&self, user_id: &str, post_id: &str) -> Result<(), AppError> {
        require_post_id(post_id)?;
        let saved_id = SavedPost::document_id(user_id, post_id);
        if self
            .store
            .get(collections::SAVED_POSTS, &saved_id)
            .await?
            .is_none()
        {
            return Err(AppError::not_found("post is not saved"));
        }
        self.store.delete(collections::SAVED_POSTS, &saved_id).await
    }

    pub async fn saved_posts(&self, user_id: &str) -> Result<Vec<SavedPostView>, AppError> {
        self.store
            .query(&Query::collection(collections::SAVED_POSTS).where_eq("userId", user_id))
            .await?
            .into_iter()
            .map(|document| {
                document.decode::<SavedPost>().map(|saved| SavedPostView {
                    post_id: saved.post_id,
                    image_url: saved.image_url,
                })
            })
            .collect()
    }
}
