//! API request and response DTOs
//!
//! Field names are camelCase on the wire. Request fields default to empty
//! so missing values surface as validation errors from the services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{
    Comment, Conversation, Message, Notification, Post, Report, Story, VerificationRequest,
    VerificationStatus, Video, timestamp,
};
use crate::service::FeedPage;

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequest {
    #[serde(default)]
    pub following_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    #[serde(default)]
    pub receiver_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub chat_id: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    #[serde(default)]
    pub post_id: String,
    #[serde(default)]
    pub comment_text: String,
}

/// Body of like, unlike and unsave
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostIdRequest {
    #[serde(default)]
    pub post_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    #[serde(default)]
    pub post_id: String,
    #[serde(default)]
    pub image_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddNotificationRequest {
    #[serde(default)]
    pub receiver_id: String,
    #[serde(default, rename = "type")]
    pub notification_type: String,
    pub post_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub fullname: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub denormalize: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationSubmitRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub bio: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[serde(default)]
    pub target_id: String,
    #[serde(default)]
    pub target_type: String,
    #[serde(default)]
    pub reason: String,
    pub description: Option<String>,
}

// =============================================================================
// Responses
// =============================================================================

/// Acknowledgement for writes that return no record
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowingListResponse {
    pub following_list: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub post_id: String,
    pub user_id: String,
    pub image_url: String,
    pub caption: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            post_id: post.id,
            user_id: post.user_id,
            image_url: post.image_url,
            caption: post.caption,
            created_at: post.created_at,
            username: post.username,
            avatar: post.avatar,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub posts: Vec<PostResponse>,
    pub next_cursor: Option<String>,
}

impl From<FeedPage> for FeedResponse {
    fn from(page: FeedPage) -> Self {
        Self {
            posts: page.posts.into_iter().map(PostResponse::from).collect(),
            next_cursor: page.next_cursor,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    pub video_id: String,
    pub user_id: String,
    pub video_url: String,
    pub caption: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub username: String,
    pub avatar: String,
}

impl From<Video> for VideoResponse {
    fn from(video: Video) -> Self {
        Self {
            video_id: video.id,
            user_id: video.user_id,
            video_url: video.video_url,
            caption: video.caption,
            created_at: video.created_at,
            username: video.username.unwrap_or_default(),
            avatar: video.avatar.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VideoListResponse {
    pub success: bool,
    pub videos: Vec<VideoResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryResponse {
    pub story_id: String,
    pub user_id: String,
    pub image_url: String,
    pub viewers: Vec<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl From<Story> for StoryResponse {
    fn from(story: Story) -> Self {
        Self {
            story_id: story.id,
            user_id: story.user_id,
            image_url: story.image_url,
            viewers: story.viewers,
            created_at: story.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub comment_id: String,
    pub post_id: String,
    pub user_id: String,
    pub comment_text: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            comment_id: comment.id,
            post_id: comment.post_id,
            user_id: comment.user_id,
            comment_text: comment.comment_text,
            created_at: comment.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentCountResponse {
    pub post_id: String,
    pub comment_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub chat_id: String,
    pub members: Vec<String>,
    pub last_message: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl From<Conversation> for ChatResponse {
    fn from(conversation: Conversation) -> Self {
        Self {
            chat_id: conversation.id,
            members: conversation.members,
            last_message: conversation.last_message,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message_id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub text: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            message_id: message.id,
            chat_id: message.chat_id,
            sender_id: message.sender_id,
            text: message.text,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSentResponse {
    pub success: bool,
    pub message_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub notification_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub post_id: Option<String>,
    pub message: String,
    pub is_read: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub sender_name: String,
    pub sender_avatar: String,
}

impl From<Notification> for NotificationResponse {
    fn from(notification: Notification) -> Self {
        Self {
            notification_id: notification.id,
            sender_id: notification.sender_id,
            receiver_id: notification.receiver_id,
            notification_type: notification.notification_type,
            post_id: notification.post_id,
            message: notification.message,
            is_read: notification.is_read,
            created_at: notification.created_at,
            sender_name: notification.sender_name.unwrap_or_default(),
            sender_avatar: notification.sender_avatar.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationCreatedResponse {
    pub success: bool,
    pub notification_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequestResponse {
    pub request_id: String,
    pub user_id: String,
    pub username: String,
    pub full_name: String,
    pub bio: String,
    pub status: VerificationStatus,
    pub is_verified: bool,
    #[serde(with = "timestamp")]
    pub requested_at: DateTime<Utc>,
}

impl From<VerificationRequest> for VerificationRequestResponse {
    fn from(request: VerificationRequest) -> Self {
        Self {
            request_id: request.id,
            user_id: request.user_id,
            username: request.username,
            full_name: request.full_name,
            bio: request.bio,
            status: request.status,
            is_verified: request.is_verified,
            requested_at: request.requested_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub report_id: String,
    pub target_id: String,
    pub target_type: String,
    pub reason: String,
    pub description: String,
    pub status: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl From<Report> for ReportResponse {
    fn from(report: Report) -> Self {
        Self {
            report_id: report.id,
            target_id: report.target_id,
            target_type: report.target_type,
            reason: report.reason,
            description: report.description,
            status: report.status,
            created_at: report.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCreatedResponse {
    pub success: bool,
    pub report_id: String,
}
