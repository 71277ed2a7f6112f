//! User profile service

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::data::{DocumentStore, Patch, Query, User, WriteBatch, collections, encode, timestamp};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub user_id: String,
    pub username: String,
    pub fullname: String,
    pub bio: String,
    pub avatar: String,
    pub is_verified: bool,
}

impl From<User> for ProfileView {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            fullname: user.fullname,
            bio: user.bio,
            avatar: user.avatar,
            is_verified: user.is_verified,
        }
    }
}

/// Directory entry for the "discover people" list
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListEntry {
    pub user_id: String,
    pub username: String,
    pub fullname: String,
    pub avatar: String,
    pub bio: String,
    pub is_following: bool,
}

/// Profile changes; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub fullname: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    /// Rewrite the copied username/avatar on the owner's posts and videos
    pub denormalize: bool,
}

/// User service
pub struct UserService {
    store: Arc<dyn DocumentStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn load(&self, user_id: &str) -> Result<Option<User>, AppError> {
        match self.store.get(collections::USERS, user_id).await? {
            Some(document) => Ok(Some(document.decode()?)),
            None => Ok(None),
        }
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<ProfileView, AppError> {
        self.load(user_id)
            .await?
            .map(ProfileView::from)
            .ok_or_else(|| AppError::not_found("user not found"))
    }

    /// Update (or create) the caller's own profile
    ///
    /// # Errors
    /// `Forbidden` when `actor_id` is not `user_id`
    pub async fn update_profile(
        &self,
        actor_id: &str,
        user_id: &str,
        update: ProfileUpdate,
    ) -> Result<ProfileView, AppError> {
        if actor_id != user_id {
            return Err(AppError::forbidden("you cannot edit another user's profile"));
        }

        let mut user = self.load(user_id).await?.unwrap_or_else(|| User {
            id: user_id.to_string(),
            ..Default::default()
        });
        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(fullname) = update.fullname {
            user.fullname = fullname;
        }
        if let Some(bio) = update.bio {
            user.bio = bio;
        }
        if let Some(avatar) = update.avatar {
            user.avatar = avatar;
        }
        user.updated_at = Some(timestamp::now());

        let mut batch = WriteBatch::new();
        batch.set(collections::USERS, user_id, encode(&user)?);

        let mut rewritten = 0;
        if update.denormalize {
            for collection in [collections::VIDEOS, collections::POSTS] {
                let owned = self
                    .store
                    .query(&Query::collection(collection).where_eq("userId", user_id))
                    .await?;
                for document in owned {
                    batch.update(
                        collection,
                        &document.id,
                        Patch::new()
                            .set("username", user.username.as_str())
                            .set("avatar", user.avatar.as_str()),
                    );
                    rewritten += 1;
                }
            }
        }
        self.store.commit(batch).await?;

        tracing::info!(user_id, rewritten, "Profile updated");
        Ok(user.into())
    }

    /// Every user except `current_user_id`, flagged with follow state
    pub async fn list_all(&self, current_user_id: &str) -> Result<Vec<UserListEntry>, AppError> {
        let following: HashSet<String> = self
            .store
            .query(&Query::collection(collections::following(current_user_id)))
            .await?
            .into_iter()
            .map(|document| document.id)
            .collect();

        let mut entries = Vec::new();
        for document in self
            .store
            .query(&Query::collection(collections::USERS))
            .await?
        {
            if document.id == current_user_id {
                continue;
            }
            let user: User = document.decode()?;
            entries.push(UserListEntry {
                is_following: following.contains(&user.id),
                user_id: user.id,
                username: user.username,
                fullname: user.fullname,
                avatar: user.avatar,
                bio: user.bio,
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MemoryStore, Video};
    use crate::service::RelationshipService;

    fn setup() -> (UserService, Arc<dyn DocumentStore>) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        (UserService::new(store.clone()), store)
    }

    fn rename(username: &str) -> ProfileUpdate {
        ProfileUpdate {
            username: Some(username.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn update_creates_then_patches() {
        let (service, _) = setup();
        assert!(matches!(
            service.get_profile("alice").await,
            Err(AppError::NotFound(_))
        ));

        service
            .update_profile(
                "alice",
                "alice",
                ProfileUpdate {
                    username: Some("alice".to_string()),
                    bio: Some("hello".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        service
            .update_profile("alice", "alice", rename("alice2"))
            .await
            .unwrap();

        let profile = service.get_profile("alice").await.unwrap();
        assert_eq!(profile.username, "alice2");
        // omitted fields are kept
        assert_eq!(profile.bio, "hello");
        assert!(!profile.is_verified);
    }

    #[tokio::test]
    async fn only_owner_updates() {
        let (service, _) = setup();
        assert!(matches!(
            service.update_profile("mallory", "alice", rename("x")).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn denormalize_rewrites_owned_videos() {
        let (service, store) = setup();
        let video = Video {
            id: String::new(),
            user_id: "alice".to_string(),
            video_url: "https://cdn/v.mp4".to_string(),
            caption: String::new(),
            created_at: timestamp::now(),
            username: Some("old".to_string()),
            avatar: Some("old.png".to_string()),
        };
        store
            .set(collections::VIDEOS, "v1", encode(&video).unwrap())
            .await
            .unwrap();

        service
            .update_profile(
                "alice",
                "alice",
                ProfileUpdate {
                    username: Some("new".to_string()),
                    avatar: Some("new.png".to_string()),
                    denormalize: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stored: Video = store
            .get(collections::VIDEOS, "v1")
            .await
            .unwrap()
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(stored.username.as_deref(), Some("new"));
        assert_eq!(stored.avatar.as_deref(), Some("new.png"));
    }

    #[tokio::test]
    async fn list_all_excludes_caller_and_flags_follows() {
        let (service, store) = setup();
        for id in ["alice", "bob", "carol"] {
            service.update_profile(id, id, rename(id)).await.unwrap();
        }
        RelationshipService::new(store)
            .follow("alice", "bob")
            .await
            .unwrap();

        let entries = service.list_all("alice").await.unwrap();
        assert_eq!(entries.len(), 2);
        let bob = entries.iter().find(|entry| entry.user_id == "bob").unwrap();
        let carol = entries.iter().find(|entry| entry.user_id == "carol").unwrap();
        assert!(bob.is_following);
        assert!(!carol.is_following);
    }
}
