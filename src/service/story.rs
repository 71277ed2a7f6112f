//! Story service

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::backfill::ProfileLookup;
use crate::data::{
    Direction, DocumentStore, EntityId, Patch, Query, Story, WriteBatch, collections, encode,
    timestamp,
};
use crate::error::AppError;
use crate::storage::{MediaStore, MediaUpload};

const STORIES_FOLDER: &str = "stories";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryItem {
    pub story_id: String,
    pub image_url: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub viewers_count: usize,
}

/// One author's stories, newest first
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryGroup {
    pub user_id: String,
    pub username: String,
    pub avatar: String,
    pub stories: Vec<StoryItem>,
}

/// Story service
pub struct StoryService {
    store: Arc<dyn DocumentStore>,
    media: Arc<dyn MediaStore>,
}

impl StoryService {
    pub fn new(store: Arc<dyn DocumentStore>, media: Arc<dyn MediaStore>) -> Self {
        Self { store, media }
    }

    pub async fn create_story(&self, user_id: &str, image: MediaUpload) -> Result<Story, AppError> {
        if image.bytes.is_empty() {
            return Err(AppError::validation("no file uploaded"));
        }
        let image_url = self.media.upload(STORIES_FOLDER, image).await?;

        let story = Story {
            id: EntityId::new().0,
            user_id: user_id.to_string(),
            image_url,
            viewers: Vec::new(),
            created_at: timestamp::now(),
        };
        let mut batch = WriteBatch::new();
        batch.create(collections::STORIES, &story.id, encode(&story)?);
        self.store.commit(batch).await?;

        tracing::info!(story_id = %story.id, user_id, "Story created");
        Ok(story)
    }

    /// All stories newest first, grouped by author in first-seen order
    pub async fn grouped_stories(&self) -> Result<Vec<StoryGroup>, AppError> {
        let documents = self
            .store
            .query(
                &Query::collection(collections::STORIES)
                    .order_by("createdAt", Direction::Descending),
            )
            .await?;

        let mut lookup = ProfileLookup::new(self.store.clone());
        let mut groups: Vec<StoryGroup> = Vec::new();
        for document in documents {
            let story: Story = document.decode()?;
            let item = StoryItem {
                story_id: story.id,
                image_url: story.image_url,
                created_at: story.created_at,
                viewers_count: story.viewers.len(),
            };

            match groups.iter_mut().find(|group| group.user_id == story.user_id) {
                Some(group) => group.stories.push(item),
                None => {
                    let author = lookup.display(&story.user_id).await?;
                    groups.push(StoryGroup {
                        user_id: story.user_id,
                        username: author.username,
                        avatar: author.avatar,
                        stories: vec![item],
                    });
                }
            }
        }
        Ok(groups)
    }

    /// Record that `viewer_id` saw the story; repeated views are no-ops
    pub async fn mark_viewed(&self, story_id: &str, viewer_id: &str) -> Result<(), AppError> {
        self.store
            .update(
                collections::STORIES,
                story_id,
                Patch::new().array_union("viewers", viewer_id),
            )
            .await
            .map_err(|error| match error {
                AppError::NotFound(_) => AppError::not_found("story not found"),
                other => other,
            })
    }
}
