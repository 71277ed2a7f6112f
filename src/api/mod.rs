//! API layer
//!
//! HTTP handlers for the mobile client, all mounted under `/api`, plus
//! the Prometheus metrics endpoint.

mod chats;
mod dto;
mod engagement;
mod extract;
mod feed;
mod follow;
pub mod metrics;
mod moderation;
mod notifications;
mod posts;
mod stories;
mod upload;
mod users;
mod videos;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::AppState;

pub use dto::*;
pub use extract::JsonBody;
pub use metrics::metrics_router;
pub use upload::{MAX_IMAGE_UPLOAD_BYTES, MAX_VIDEO_UPLOAD_BYTES};

/// Create the `/api` router
///
/// Handlers taking a `CurrentUser` require a bearer token; the rest are public.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Follow graph
        .route("/follow", post(follow::follow).delete(follow::unfollow))
        .route("/follow/:userId", get(follow::counts))
        .route(
            "/follow/check-following/:userId",
            get(follow::following_ids),
        )
        .route("/follow/following/:userId", get(follow::following))
        .route("/follow/followers/:userId", get(follow::followers))
        // Feed
        .route("/profile/feed/:userId", get(feed::home_feed))
        // Conversations
        .route(
            "/chats",
            post(chats::get_or_create_chat).get(chats::list_chats),
        )
        .route("/messages/send", post(chats::send_message))
        .route("/messages/:chatId", get(chats::list_messages))
        // Users
        .route("/users/:userId", get(users::get_user))
        .route("/users/update/:userId", put(users::update_user))
        .route("/users/all/:currentUserId", get(users::list_users))
        // Posts and comments
        .route("/posts/upload", post(posts::upload_post))
        .route(
            "/posts/:id",
            get(posts::posts_by_user).delete(posts::delete_post),
        )
        .route("/comment", post(posts::add_comment))
        .route("/comments/:postId", get(posts::comments_for))
        .route("/comments/count/:postId", get(posts::comment_count))
        .route(
            "/comments/delete/:commentId",
            axum::routing::delete(posts::delete_comment),
        )
        // Likes and bookmarks
        .route("/likes/like", post(engagement::like))
        .route("/likes/unlike", axum::routing::delete(engagement::unlike))
        .route("/likes/user/:userId", get(engagement::liked_posts))
        .route("/likes/:postId", get(engagement::likes_for))
        .route("/save", post(engagement::save))
        .route("/unsave", post(engagement::unsave))
        .route("/saved-posts", get(engagement::saved_posts))
        // Stories
        .route("/stories/upload", post(stories::upload_story))
        .route("/stories/list", get(stories::list_stories))
        .route("/stories/:storyId/view", post(stories::view_story))
        // Videos
        .route("/video/upload", post(videos::upload_video))
        .route("/video/videos", get(videos::all_videos))
        .route("/video/videos/:userId", get(videos::videos_by_user))
        .route(
            "/video/delete/:videoId",
            axum::routing::delete(videos::delete_video),
        )
        // Notifications
        .route(
            "/notifications",
            get(notifications::list_notifications),
        )
        .route("/notifications/add", post(notifications::add_notification))
        .route(
            "/notifications/read/:notificationId",
            put(notifications::mark_read),
        )
        // Verification and reports
        .route(
            "/verify-request",
            post(moderation::submit_verification).get(moderation::list_verifications),
        )
        .route(
            "/verify-request/status/:userId",
            get(moderation::verification_status),
        )
        .route(
            "/verify-request/:requestId",
            put(moderation::review_verification),
        )
        .route("/report", post(moderation::create_report))
        .route("/report/my-reports", get(moderation::my_reports))
}
