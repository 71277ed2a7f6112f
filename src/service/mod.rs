//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate document store and media storage operations.

pub mod backfill;
mod chat;
mod engagement;
mod feed;
mod notification;
mod post;
mod relationship;
mod report;
mod story;
mod user;
mod verification;
mod video;

pub use backfill::{DisplayProfile, ProfileLookup};
pub use chat::{ChatService, ConversationSummary, OtherUser, conversation_id};
pub use engagement::{EngagementService, LikedPost, PostLikes, SavedPostView};
pub use feed::{FeedAssembler, FeedCursor, FeedPage};
pub use notification::{NewNotification, NotificationService};
pub use post::{CommentView, PostService};
pub use relationship::{FollowCounts, RelationshipService};
pub use report::{NewReport, ReportService};
pub use story::{StoryGroup, StoryItem, StoryService};
pub use user::{ProfileUpdate, ProfileView, UserListEntry, UserService};
pub use verification::{VerificationService, VerificationStatusView, VerificationSubmission};
pub use video::VideoService;
