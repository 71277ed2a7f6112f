//! Video service
//!
//! Short videos for the Watch tab. Listings carry the author's username and
//! avatar, taken from the copy on the video when present.

use std::sync::Arc;

use super::backfill::ProfileLookup;
use crate::data::{
    Direction, DocumentStore, EntityId, Query, User, Video, WriteBatch, collections, encode,
    timestamp,
};
use crate::error::AppError;
use crate::storage::{MediaStore, MediaUpload};

const VIDEOS_FOLDER: &str = "videos";

/// Video service
pub struct VideoService {
    store: Arc<dyn DocumentStore>,
    media: Arc<dyn MediaStore>,
}

impl VideoService {
    pub fn new(store: Arc<dyn DocumentStore>, media: Arc<dyn MediaStore>) -> Self {
        Self { store, media }
    }

    pub async fn create_video(
        &self,
        user_id: &str,
        video: MediaUpload,
        caption: &str,
    ) -> Result<Video, AppError> {
        if video.bytes.is_empty() {
            return Err(AppError::validation("no file uploaded"));
        }

        let owner: Option<User> = match self.store.get(collections::USERS, user_id).await? {
            Some(document) => Some(document.decode()?),
            None => None,
        };
        let video_url = self.media.upload(VIDEOS_FOLDER, video).await?;

        let video = Video {
            id: EntityId::new().0,
            user_id: user_id.to_string(),
            video_url,
            caption: caption.to_string(),
            created_at: timestamp::now(),
            username: owner.as_ref().map(|user| user.username.clone()),
            avatar: owner.as_ref().map(|user| user.avatar.clone()),
        };
        let mut batch = WriteBatch::new();
        batch.create(collections::VIDEOS, &video.id, encode(&video)?);
        self.store.commit(batch).await?;

        tracing::info!(video_id = %video.id, user_id, "Video created");
        Ok(video)
    }

    /// Every video, newest first
    pub async fn all_videos(&self) -> Result<Vec<Video>, AppError> {
        self.list(Query::collection(collections::VIDEOS)).await
    }

    /// Videos by `user_id`, newest first
    pub async fn videos_by_user(&self, user_id: &str) -> Result<Vec<Video>, AppError> {
        self.list(Query::collection(collections::VIDEOS).where_eq("userId", user_id))
            .await
    }

    async fn list(&self, query: Query) -> Result<Vec<Video>, AppError> {
        let documents = self
            .store
            .query(&query.order_by("createdAt", Direction::Descending))
            .await?;

        let mut lookup = ProfileLookup::new(self.store.clone());
        let mut videos = Vec::with_capacity(documents.len());
        for document in documents {
            let mut video: Video = document.decode()?;
            let (username, avatar) = lookup
                .backfill(&video.user_id, video.username.as_deref(), video.avatar.as_deref())
                .await?;
            video.username = Some(username);
            video.avatar = Some(avatar);
            videos.push(video);
        }
        Ok(videos)
    }

    pub async fn delete_video(&self, video_id: &str, user_id: &str) -> Result<(), AppError> {
        let video: Video = self
            .store
            .get(collections::VIDEOS, video_id)
            .await?
            .ok_or_else(|| AppError::not_found("video not found"))?
            .decode()?;
        if video.user_id != user_id {
            return Err(AppError::forbidden("you cannot delete another user's video"));
        }
        self.store.delete(collections::VIDEOS, video_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryStore;
    use crate::storage::MockMediaStore;

    fn clip() -> MediaUpload {
        MediaUpload {
            bytes: vec![0, 0, 0, 0x18],
            content_type: "video/mp4".to_string(),
        }
    }

    async fn setup() -> (VideoService, Arc<dyn DocumentStore>) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let mut media = MockMediaStore::new();
        media
            .expect_upload()
            .withf(|folder, _| folder == VIDEOS_FOLDER)
            .returning(|_, upload| Ok(format!("https://cdn/videos/{}.mp4", upload.bytes.len())));
        (VideoService::new(store.clone(), Arc::new(media)), store)
    }

    #[tokio::test]
    async fn listings_backfill_missing_author_fields() {
        let (service, store) = setup().await;

        // uploaded before the profile existed: no copied fields
        let early = service.create_video("alice", clip(), "first").await.unwrap();
        assert!(early.username.is_none());

        let alice = User {
            id: "alice".to_string(),
            username: "alice".to_string(),
            avatar: "https://cdn/alice.png".to_string(),
            ..Default::default()
        };
        store
            .set(collections::USERS, "alice", encode(&alice).unwrap())
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let late = service.create_video("alice", clip(), "second").await.unwrap();
        assert_eq!(late.username.as_deref(), Some("alice"));

        let videos = service.videos_by_user("alice").await.unwrap();
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].caption, "second");
        for video in &videos {
            assert_eq!(video.username.as_deref(), Some("alice"));
            assert_eq!(video.avatar.as_deref(), Some("https://cdn/alice.png"));
        }

        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        service.create_video("ghost", clip(), "").await.unwrap();
        let all = service.all_videos().await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(
            all[0].username.as_deref(),
            Some(crate::service::backfill::UNKNOWN_USERNAME)
        );
    }

    #[tokio::test]
    async fn only_owner_can_delete() {
        let (service, _) = setup().await;
        let video = service.create_video("alice", clip(), "").await.unwrap();

        assert!(matches!(
            service.delete_video(&video.id, "bob").await,
            Err(AppError::Forbidden(_))
        ));
        service.delete_video(&video.id, "alice").await.unwrap();
        assert!(matches!(
            service.delete_video(&video.id, "alice").await,
            Err(AppError::NotFound(_))
        ));
    }
}
