//! Per-request profile join table
//!
//! Listings show author names and avatars. Records that carry copied
//! fields use them; everything else resolves the author through a
//! `ProfileLookup`, which reads each user at most once per request.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::data::{DocumentStore, User, collections};
use crate::error::AppError;

pub const UNKNOWN_USERNAME: &str = "Unknown user";

/// Author fields shown next to a record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayProfile {
    pub user_id: String,
    pub username: String,
    pub fullname: String,
    pub avatar: String,
}

impl DisplayProfile {
    pub fn placeholder(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            username: UNKNOWN_USERNAME.to_string(),
            fullname: String::new(),
            avatar: String::new(),
        }
    }

    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            username: user.username.clone(),
            fullname: user.fullname.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

/// User lookups memoized for the lifetime of one request (misses included)
pub struct ProfileLookup {
    store: Arc<dyn DocumentStore>,
    users: HashMap<String, Option<User>>,
    lookups: usize,
}

impl ProfileLookup {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            users: HashMap::new(),
            lookups: 0,
        }
    }

    /// The user, or `None` when the profile does not exist
    pub async fn user(&mut self, user_id: &str) -> Result<Option<User>, AppError> {
        if let Some(cached) = self.users.get(user_id) {
            return Ok(cached.clone());
        }

        self.lookups += 1;
        let user = match self.store.get(collections::USERS, user_id).await? {
            Some(document) => Some(document.decode::<User>()?),
            None => None,
        };
        self.users.insert(user_id.to_string(), user.clone());
        Ok(user)
    }

    /// Profile fields, falling back to the placeholder on a miss
    pub async fn display(&mut self, user_id: &str) -> Result<DisplayProfile, AppError> {
        Ok(match self.user(user_id).await? {
            Some(user) => DisplayProfile::from_user(&user),
            None => DisplayProfile::placeholder(user_id),
        })
    }

    /// `(username, avatar)` for a record with optional copied fields.
    ///
    /// Copied values win when present and non-empty.
    pub async fn backfill(
        &mut self,
        user_id: &str,
        cached_username: Option<&str>,
        cached_avatar: Option<&str>,
    ) -> Result<(String, String), AppError> {
        let cached_username = cached_username.filter(|name| !name.is_empty());
        let cached_avatar = cached_avatar.filter(|avatar| !avatar.is_empty());

        if let (Some(username), Some(avatar)) = (cached_username, cached_avatar) {
            return Ok((username.to_string(), avatar.to_string()));
        }

        let profile = self.display(user_id).await?;
        Ok((
            cached_username.map_or(profile.username, str::to_string),
            cached_avatar.map_or(profile.avatar, str::to_string),
        ))
    }

    /// Number of store reads issued so far
    pub fn lookups(&self) -> usize {
        self.lookups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MemoryStore, encode};

    async fn store_with_alice() -> Arc<dyn DocumentStore> {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let alice = User {
            id: "alice".to_string(),
            username: "alice".to_string(),
            fullname: "Alice A".to_string(),
            avatar: "https://cdn/alice.png".to_string(),
            ..Default::default()
        };
        store
            .set(collections::USERS, "alice", encode(&alice).unwrap())
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn lookups_are_memoized_including_misses() {
        let mut lookup = ProfileLookup::new(store_with_alice().await);

        lookup.display("alice").await.unwrap();
        lookup.display("alice").await.unwrap();
        let ghost = lookup.display("ghost").await.unwrap();
        lookup.display("ghost").await.unwrap();

        assert_eq!(lookup.lookups(), 2);
        assert_eq!(ghost.username, UNKNOWN_USERNAME);
        assert_eq!(ghost.avatar, "");
    }

    #[tokio::test]
    async fn copied_fields_win() {
        let mut lookup = ProfileLookup::new(store_with_alice().await);

        let (name, avatar) = lookup
            .backfill("alice", Some("old-name"), Some("old.png"))
            .await
            .unwrap();
        assert_eq!((name.as_str(), avatar.as_str()), ("old-name", "old.png"));
        assert_eq!(lookup.lookups(), 0);

        let (name, avatar) = lookup.backfill("alice", Some("old-name"), None).await.unwrap();
        assert_eq!(name, "old-name");
        assert_eq!(avatar, "https://cdn/alice.png");

        let (name, _) = lookup.backfill("ghost", None, Some("")).await.unwrap();
        assert_eq!(name, UNKNOWN_USERNAME);
    }
}
