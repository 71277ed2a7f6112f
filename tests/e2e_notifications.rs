//! E2E tests for notifications

mod common;

use common::TestServer;
use reqwest::Method;
use serde_json::{Value, json};

#[tokio::test]
async fn test_add_list_and_mark_read() {
    let server = TestServer::new().await;
    server.seed_user("alice").await;

    let response = server
        .post_json(
            "/api/notifications/add",
            "alice",
            json!({ "receiverId": "bob", "type": "follow", "message": "alice followed you" }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["success"], true);
    let notification_id = created["notificationId"].as_str().unwrap();

    let listed: Value = server
        .get("/api/notifications", Some("bob"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listed[0]["notificationId"], notification_id);
    assert_eq!(listed[0]["senderName"], "alice");
    assert_eq!(listed[0]["isRead"], false);

    let response = server
        .send_json(
            Method::PUT,
            &format!("/api/notifications/read/{notification_id}"),
            "alice",
            json!({}),
        )
        .await;
    assert_eq!(response.status(), 403);

    let response = server
        .send_json(
            Method::PUT,
            &format!("/api/notifications/read/{notification_id}"),
            "bob",
            json!({}),
        )
        .await;
    assert_eq!(response.status(), 200);

    let listed: Value = server
        .get("/api/notifications", Some("bob"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listed[0]["isRead"], true);

    let response = server
        .send_json(
            Method::PUT,
            "/api/notifications/read/missing",
            "bob",
            json!({}),
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_add_requires_receiver_and_type() {
    let server = TestServer::new().await;

    let response = server
        .post_json("/api/notifications/add", "alice", json!({ "type": "follow" }))
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_listing_requires_token() {
    let server = TestServer::new().await;

    let response = server.get("/api/notifications", None).await;
    assert_eq!(response.status(), 401);
}
