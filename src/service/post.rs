//! Post service
//!
//! Handles image posts and their comments.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::backfill::ProfileLookup;
use crate::data::{
    Comment, Direction, DocumentStore, EntityId, Post, Query, User, WriteBatch, collections,
    encode, timestamp,
};
use crate::error::AppError;
use crate::storage::{MediaStore, MediaUpload};

const POSTS_FOLDER: &str = "posts";

/// Comment joined with its author
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub comment_id: String,
    pub post_id: String,
    pub user_id: String,
    pub username: String,
    pub avatar: String,
    pub comment_text: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Post service
pub struct PostService {
    store: Arc<dyn DocumentStore>,
    media: Arc<dyn MediaStore>,
}

impl PostService {
    pub fn new(store: Arc<dyn DocumentStore>, media: Arc<dyn MediaStore>) -> Self {
        Self { store, media }
    }

    async fn load_post(&self, post_id: &str) -> Result<Post, AppError> {
        self.store
            .get(collections::POSTS, post_id)
            .await?
            .ok_or_else(|| AppError::not_found("post not found"))?
            .decode()
    }

    /// Upload the image and create the post
    ///
    /// The owner's username and avatar are copied onto the post when the
    /// profile exists.
    pub async fn create_post(
        &self,
        user_id: &str,
        image: MediaUpload,
        caption: &str,
    ) -> Result<Post, AppError> {
        if image.bytes.is_empty() {
            return Err(AppError::validation("no file uploaded"));
        }

        let owner: Option<User> = match self.store.get(collections::USERS, user_id).await? {
            Some(document) => Some(document.decode()?),
            None => None,
        };

        let image_url = self.media.upload(POSTS_FOLDER, image).await?;

        let post = Post {
            id: EntityId::new().0,
            user_id: user_id.to_string(),
            image_url,
            caption: caption.to_string(),
            created_at: timestamp::now(),
            username: owner.as_ref().map(|user| user.username.clone()),
            avatar: owner.as_ref().map(|user| user.avatar.clone()),
        };

        let mut batch = WriteBatch::new();
        batch.create(collections::POSTS, &post.id, encode(&post)?);
        self.store.commit(batch).await?;

        tracing::info!(post_id = %post.id, user_id, "Post created");
        Ok(post)
    }

    /// Posts by `user_id`, newest first
    pub async fn posts_by_user(&self, user_id: &str) -> Result<Vec<Post>, AppError> {
        self.store
            .query(
                &Query::collection(collections::POSTS)
                    .where_eq("userId", user_id)
                    .order_by("createdAt", Direction::Descending),
            )
            .await?
            .into_iter()
            .map(|document| document.decode())
            .collect()
    }

    /// Delete a post together with its comments and likes
    ///
    /// # Errors
    /// `NotFound` if the post is missing, `Forbidden` unless `user_id` owns it
    pub async fn delete_post(&self, post_id: &str, user_id: &str) -> Result<(), AppError> {
        let post = self.load_post(post_id).await?;
        if post.user_id != user_id {
            return Err(AppError::forbidden("you cannot delete another user's post"));
        }

        let comments = self
            .store
            .query(&Query::collection(collections::COMMENTS).where_eq("postId", post_id))
            .await?;
        let likes = self
            .store
            .query(&Query::collection(collections::LIKES).where_eq("postId", post_id))
            .await?;

        let mut batch = WriteBatch::new();
        batch.delete(collections::POSTS, post_id);
        for comment in &comments {
            batch.delete(collections::COMMENTS, &comment.id);
        }
        for like in &likes {
            batch.delete(collections::LIKES, &like.id);
        }
        self.store.commit(batch).await?;

        tracing::info!(
            post_id,
            comments = comments.len(),
            likes = likes.len(),
            "Post deleted"
        );
        Ok(())
    }

    // =========================================================================
    // Comments
    // =========================================================================

    pub async fn add_comment(
        &self,
        user_id: &str,
        post_id: &str,
        text: &str,
    ) -> Result<Comment, AppError> {
        if post_id.trim().is_empty() || text.trim().is_empty() {
            return Err(AppError::validation("postId and commentText are required"));
        }
        self.load_post(post_id).await?;

        let comment = Comment {
            id: EntityId::new().0,
            post_id: post_id.to_string(),
            user_id: user_id.to_string(),
            comment_text: text.to_string(),
            created_at: timestamp::now(),
        };
        let mut batch = WriteBatch::new();
        batch.create(collections::COMMENTS, &comment.id, encode(&comment)?);
        self.store.commit(batch).await?;

        Ok(comment)
    }

    /// Comments on a post, newest first, with author fields
    pub async fn comments_for(&self, post_id: &str) -> Result<Vec<CommentView>, AppError> {
        let documents = self
            .store
            .query(
                &Query::collection(collections::COMMENTS)
                    .where_eq("postId", post_id)
                    .order_by("createdAt", Direction::Descending),
            )
            .await?;

        let mut lookup = ProfileLookup::new(self.store.clone());
        let mut comments = Vec::with_capacity(documents.len());
        for document in documents {
            let comment: Comment = document.decode()?;
            let author = lookup.display(&comment.user_id).await?;
            comments.push(CommentView {
                comment_id: comment.id,
                post_id: comment.post_id,
                user_id: comment.user_id,
                username: author.username,
                avatar: author.avatar,
                comment_text: comment.comment_text,
                created_at: comment.created_at,
            });
        }
        Ok(comments)
    }

    pub async fn comment_count(&self, post_id: &str) -> Result<usize, AppError> {
        self.store
            .count(&Query::collection(collections::COMMENTS).where_eq("postId", post_id))
            .await
    }

    pub async fn delete_comment(&self, comment_id: &str, user_id: &str) -> Result<(), AppError> {
        let comment: Comment = self
            .store
            .get(collections::COMMENTS, comment_id)
            .await?
            .ok_or_else(|| AppError::not_found("comment not found"))?
            .decode()?;
        if comment.user_id != user_id {
            return Err(AppError::forbidden("you cannot delete this comment"));
        }

        self.store.delete(collections::COMMENTS, comment_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Like, MemoryStore};
    use crate::storage::MockMediaStore;

    fn media_returning(url: &'static str) -> Arc<dyn MediaStore> {
        let mut media = MockMediaStore::new();
        media
            .expect_upload()
            .withf(|folder, upload| folder == POSTS_FOLDER && !upload.bytes.is_empty())
            .returning(move |_, _| Ok(url.to_string()));
        Arc::new(media)
    }

    fn image() -> MediaUpload {
        MediaUpload {
            bytes: vec![0xFF, 0xD8, 0xFF],
            content_type: "image/jpeg".to_string(),
        }
    }

    async fn setup() -> (PostService, Arc<dyn DocumentStore>) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let bob = User {
            id: "bob".to_string(),
            username: "bobby".to_string(),
            avatar: "https://cdn/bob.png".to_string(),
            ..Default::default()
        };
        store
            .set(collections::USERS, "bob", encode(&bob).unwrap())
            .await
            .unwrap();
        let service = PostService::new(store.clone(), media_returning("https://cdn/posts/p.jpg"));
        (service, store)
    }

    #[tokio::test]
    async fn create_post_uploads_and_copies_profile() {
        let (service, _) = setup().await;
        let post = service.create_post("bob", image(), "sunset").await.unwrap();

        assert_eq!(post.image_url, "https://cdn/posts/p.jpg");
        assert_eq!(post.username.as_deref(), Some("bobby"));
        assert_eq!(post.avatar.as_deref(), Some("https://cdn/bob.png"));

        let listed = service.posts_by_user("bob").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].caption, "sunset");
    }

    #[tokio::test]
    async fn empty_upload_is_rejected_without_touching_media() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let mut media = MockMediaStore::new();
        media.expect_upload().never();
        let service = PostService::new(store, Arc::new(media));

        let empty = MediaUpload {
            bytes: Vec::new(),
            content_type: "image/png".to_string(),
        };
        assert!(matches!(
            service.create_post("bob", empty, "").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn delete_post_cascades_to_comments_and_likes() {
        let (service, store) = setup().await;
        let post = service.create_post("bob", image(), "").await.unwrap();
        let other = service.create_post("bob", image(), "keep").await.unwrap();

        service.add_comment("alice", &post.id, "nice").await.unwrap();
        service.add_comment("carol", &post.id, "wow").await.unwrap();
        service.add_comment("alice", &other.id, "kept").await.unwrap();
        let like = Like {
            id: String::new(),
            user_id: "alice".to_string(),
            post_id: post.id.clone(),
            liked_at: timestamp::now(),
        };
        store
            .set(
                collections::LIKES,
                &Like::document_id("alice", &post.id),
                encode(&like).unwrap(),
            )
            .await
            .unwrap();

        assert!(matches!(
            service.delete_post(&post.id, "alice").await,
            Err(AppError::Forbidden(_))
        ));
        service.delete_post(&post.id, "bob").await.unwrap();

        assert!(service.comments_for(&post.id).await.unwrap().is_empty());
        assert_eq!(service.comment_count(&other.id).await.unwrap(), 1);
        assert_eq!(
            store
                .count(&Query::collection(collections::LIKES).where_eq("postId", post.id.as_str()))
                .await
                .unwrap(),
            0
        );
        assert!(matches!(
            service.delete_post(&post.id, "bob").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn comments_are_joined_with_authors() {
        let (service, _) = setup().await;
        let post = service.create_post("bob", image(), "").await.unwrap();

        service.add_comment("ghost", &post.id, "first").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        service.add_comment("bob", &post.id, "second").await.unwrap();

        let comments = service.comments_for(&post.id).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].comment_text, "second");
        assert_eq!(comments[0].username, "bobby");
        assert_eq!(comments[1].username, crate::service::backfill::UNKNOWN_USERNAME);
    }

    #[tokio::test]
    async fn comment_rules() {
        let (service, _) = setup().await;
        assert!(matches!(
            service.add_comment("alice", "missing", "hi").await,
            Err(AppError::NotFound(_))
        ));

        let post = service.create_post("bob", image(), "").await.unwrap();
        assert!(matches!(
            service.add_comment("alice", &post.id, "   ").await,
            Err(AppError::Validation(_))
        ));

        let comment = service.add_comment("alice", &post.id, "hi").await.unwrap();
        assert!(matches!(
            service.delete_comment(&comment.id, "bob").await,
            Err(AppError::Forbidden(_))
        ));
        service.delete_comment(&comment.id, "alice").await.unwrap();
        assert_eq!(service.comment_count(&post.id).await.unwrap(), 0);
        assert!(matches!(
            service.delete_comment(&comment.id, "alice").await,
            Err(AppError::NotFound(_))
        ));
    }
}
