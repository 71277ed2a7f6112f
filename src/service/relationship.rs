//! Relationship service
//!
//! Follow edges are stored twice: under the follower's `following` set and
//! under the followee's `followers` set. Both records are written and
//! removed in one batch so they exist together or not at all.

use std::sync::Arc;

use serde::Serialize;

use super::backfill::{DisplayProfile, ProfileLookup};
use crate::data::{DocumentStore, FollowRecord, Query, WriteBatch, collections, encode, timestamp};
use crate::error::AppError;
use crate::metrics::FOLLOWS_TOTAL;

/// Follower / following cardinalities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowCounts {
    pub followers_count: usize,
    pub following_count: usize,
}

/// Relationship service
pub struct RelationshipService {
    store: Arc<dyn DocumentStore>,
}

impl RelationshipService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create the edge `follower_id -> following_id`
    ///
    /// # Errors
    /// `Validation` for empty or equal ids, `Conflict` if the edge exists
    pub async fn follow(&self, follower_id: &str, following_id: &str) -> Result<(), AppError> {
        if following_id.trim().is_empty() {
            return Err(AppError::validation("followingId is required"));
        }
        if follower_id == following_id {
            return Err(AppError::validation("you cannot follow yourself"));
        }

        let following = collections::following(follower_id);
        let followers = collections::followers(following_id);

        if self.store.get(&following, following_id).await?.is_some() {
            return Err(already_following());
        }

        let followed_at = timestamp::now();
        let outgoing = FollowRecord {
            id: String::new(),
            user_id: following_id.to_string(),
            followed_at,
        };
        let incoming = FollowRecord {
            id: String::new(),
            user_id: follower_id.to_string(),
            followed_at,
        };

        let mut batch = WriteBatch::new();
        batch
            .create(&following, following_id, encode(&outgoing)?)
            .create(&followers, follower_id, encode(&incoming)?);

        // A concurrent follow that won the race surfaces as a batch conflict.
        self.store.commit(batch).await.map_err(|error| match error {
            AppError::Conflict(_) => already_following(),
            other => other,
        })?;

        FOLLOWS_TOTAL.with_label_values(&["follow"]).inc();
        tracing::info!(follower_id, following_id, "Follow created");
        Ok(())
    }

    /// Remove the edge; removing a missing edge is a no-op
    pub async fn unfollow(&self, follower_id: &str, following_id: &str) -> Result<(), AppError> {
        if following_id.trim().is_empty() {
            return Err(AppError::validation("followingId is required"));
        }

        let mut batch = WriteBatch::new();
        batch
            .delete(&collections::following(follower_id), following_id)
            .delete(&collections::followers(following_id), follower_id);
        self.store.commit(batch).await?;

        FOLLOWS_TOTAL.with_label_values(&["unfollow"]).inc();
        tracing::info!(follower_id, following_id, "Follow removed");
        Ok(())
    }

    pub async fn counts(&self, user_id: &str) -> Result<FollowCounts, AppError> {
        let followers_count = self
            .store
            .count(&Query::collection(collections::followers(user_id)))
            .await?;
        let following_count = self
            .store
            .count(&Query::collection(collections::following(user_id)))
            .await?;

        Ok(FollowCounts {
            followers_count,
            following_count,
        })
    }

    pub async fn is_following(&self, follower_id: &str, following_id: &str) -> Result<bool, AppError> {
        Ok(self
            .store
            .get(&collections::following(follower_id), following_id)
            .await?
            .is_some())
    }

    /// Ids `user_id` follows
    pub async fn following_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        self.ids(collections::following(user_id)).await
    }

    /// Ids following `user_id`
    pub async fn follower_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        self.ids(collections::followers(user_id)).await
    }

    /// Followed accounts joined with their profiles; missing profiles are skipped
    pub async fn following_profiles(&self, user_id: &str) -> Result<Vec<DisplayProfile>, AppError> {
        let ids = self.following_ids(user_id).await?;
        self.join_profiles(ids).await
    }

    /// Followers joined with their profiles; missing profiles are skipped
    pub async fn follower_profiles(&self, user_id: &str) -> Result<Vec<DisplayProfile>, AppError> {
        let ids = self.follower_ids(user_id).await?;
        self.join_profiles(ids).await
    }

    async fn ids(&self, collection: String) -> Result<Vec<String>, AppError> {
        Ok(self
            .store
            .query(&Query::collection(collection))
            .await?
            .into_iter()
            .map(|document| document.id)
            .collect())
    }

    async fn join_profiles(&self, ids: Vec<String>) -> Result<Vec<DisplayProfile>, AppError> {
        let mut lookup = ProfileLookup::new(self.store.clone());
        let mut profiles = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = lookup.user(&id).await? {
                profiles.push(DisplayProfile {
                    user_id: id,
                    ..DisplayProfile::from_user(&user)
                });
            }
        }
        Ok(profiles)
    }
}

fn already_following() -> AppError {
    AppError::conflict("already following this user")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MemoryStore, User};

    fn service() -> (RelationshipService, Arc<dyn DocumentStore>) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        (RelationshipService::new(store.clone()), store)
    }

    async fn seed_user(store: &Arc<dyn DocumentStore>, id: &str) {
        let user = User {
            id: id.to_string(),
            username: id.to_string(),
            ..Default::default()
        };
        store
            .set(collections::USERS, id, encode(&user).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn follow_writes_both_records() {
        let (service, store) = service();
        service.follow("alice", "bob").await.unwrap();

        let outgoing = store
            .get(&collections::following("alice"), "bob")
            .await
            .unwrap()
            .unwrap()
            .decode::<FollowRecord>()
            .unwrap();
        let incoming = store
            .get(&collections::followers("bob"), "alice")
            .await
            .unwrap()
            .unwrap()
            .decode::<FollowRecord>()
            .unwrap();

        assert_eq!(outgoing.user_id, "bob");
        assert_eq!(incoming.user_id, "alice");
        assert_eq!(outgoing.followed_at, incoming.followed_at);
        assert!(service.is_following("alice", "bob").await.unwrap());
        assert!(!service.is_following("bob", "alice").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_follow_conflicts_and_counts_once() {
        let (service, _) = service();
        service.follow("alice", "bob").await.unwrap();

        let err = service.follow("alice", "bob").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let alice = service.counts("alice").await.unwrap();
        let bob = service.counts("bob").await.unwrap();
        assert_eq!(alice.following_count, 1);
        assert_eq!(alice.followers_count, 0);
        assert_eq!(bob.followers_count, 1);
    }

    #[tokio::test]
    async fn self_follow_is_rejected() {
        let (service, _) = service();
        let err = service.follow("alice", "alice").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(service.counts("alice").await.unwrap().following_count, 0);
    }

    #[tokio::test]
    async fn unfollow_removes_both_records_and_is_idempotent() {
        let (service, store) = service();
        service.follow("alice", "bob").await.unwrap();

        service.unfollow("alice", "bob").await.unwrap();
        service.unfollow("alice", "bob").await.unwrap();

        assert!(store
            .get(&collections::following("alice"), "bob")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .get(&collections::followers("bob"), "alice")
            .await
            .unwrap()
            .is_none());
        assert_eq!(service.counts("bob").await.unwrap().followers_count, 0);
    }

    #[tokio::test]
    async fn joined_lists_skip_missing_profiles() {
        let (service, store) = service();
        seed_user(&store, "bob").await;
        service.follow("alice", "bob").await.unwrap();
        service.follow("alice", "ghost").await.unwrap();

        let mut ids = service.following_ids("alice").await.unwrap();
        ids.sort();
        assert_eq!(ids, vec!["bob", "ghost"]);

        let profiles = service.following_profiles("alice").await.unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].user_id, "bob");

        assert!(service.follower_profiles("bob").await.unwrap().is_empty());
        assert_eq!(service.follower_ids("bob").await.unwrap(), vec!["alice"]);
    }
}
