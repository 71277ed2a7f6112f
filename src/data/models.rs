//! Data models
//!
//! Rust structs representing stored documents.
//! All models use ULID for generated IDs and chrono for timestamps.
//! Field names are camelCase on the wire and in the store, matching what
//! the mobile client reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Collections
// =============================================================================

/// Collection names in the document store.
pub mod collections {
    pub const USERS: &str = "users";
    pub const POSTS: &str = "posts";
    pub const VIDEOS: &str = "videos";
    pub const STORIES: &str = "stories";
    pub const COMMENTS: &str = "comments";
    pub const LIKES: &str = "likes";
    pub const SAVED_POSTS: &str = "saved_posts";
    pub const CHATS: &str = "chats";
    pub const MESSAGES: &str = "messages";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const VERIFICATION_REQUESTS: &str = "verification_requests";
    /// One document per user holding a pending or approved request.
    pub const VERIFICATION_ACTIVE: &str = "verification_active";
    pub const REPORTS: &str = "reports";

    /// Accounts `user_id` follows, keyed by the followed user's id.
    pub fn following(user_id: &str) -> String {
        format!("following/{user_id}/following")
    }

    /// Accounts following `user_id`, keyed by the follower's id.
    pub fn followers(user_id: &str) -> String {
        format!("followers/{user_id}/followers")
    }
}

// =============================================================================
// Timestamps
// =============================================================================

/// Fixed-width RFC 3339 timestamps (microsecond precision, `Z` suffix).
///
/// Stores order documents by comparing the serialized strings, so every
/// timestamp must have the same width.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Current time at stored precision, so a freshly built record equals
    /// its stored copy.
    pub fn now() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(raw).map(|parsed| parsed.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => serializer.serialize_str(&super::format(value)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|raw| super::parse(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

// =============================================================================
// User
// =============================================================================

/// User profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Follow graph
// =============================================================================

/// One half of a follow edge.
///
/// Stored under `following/{follower}/following/{followed}` with `user_id`
/// set to the followed user, and mirrored under
/// `followers/{followed}/followers/{follower}` with `user_id` set to the
/// follower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRecord {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    #[serde(with = "timestamp")]
    pub followed_at: DateTime<Utc>,
}

// =============================================================================
// Posts, videos, stories
// =============================================================================

/// Image post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub image_url: String,
    #[serde(default)]
    pub caption: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Owner's username copied at write time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Owner's avatar copied at write time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Short video for the Watch tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub video_url: String,
    #[serde(default)]
    pub caption: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Story; `viewers` only ever grows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub image_url: String,
    #[serde(default)]
    pub viewers: Vec<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Engagement
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default)]
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub comment_text: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Like; the document id is `{user_id}_{post_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub post_id: String,
    #[serde(with = "timestamp")]
    pub liked_at: DateTime<Utc>,
}

impl Like {
    pub fn document_id(user_id: &str, post_id: &str) -> String {
        format!("{user_id}_{post_id}")
    }
}

/// Bookmark; the document id is `{user_id}_{post_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPost {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub post_id: String,
    pub image_url: String,
    #[serde(with = "timestamp")]
    pub saved_at: DateTime<Utc>,
}

impl SavedPost {
    pub fn document_id(user_id: &str, post_id: &str) -> String {
        format!("{user_id}_{post_id}")
    }
}

// =============================================================================
// Chat
// =============================================================================

/// One-to-one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(default)]
    pub id: String,
    /// Both participants, sorted
    pub members: Vec<String>,
    #[serde(default)]
    pub last_message: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|member| member == user_id)
    }
}

/// Chat message (append-only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub text: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default)]
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    /// like, comment, follow, ...
    #[serde(rename = "type")]
    pub notification_type: String,
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Sender's username copied at write time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_avatar: Option<String>,
}

// =============================================================================
// Verification requests & reports
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Anything but a rejection blocks a new request.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

/// Marker keyed by user id while that user's request is active
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveVerification {
    pub request_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub bio: String,
    pub status: VerificationStatus,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(with = "timestamp")]
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(default)]
    pub id: String,
    pub reporter_id: String,
    pub target_id: String,
    /// post, video, user, comment
    pub target_type: String,
    pub reason: String,
    #[serde(default)]
    pub description: String,
    /// pending, reviewed, resolved
    pub status: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}
