//! E2E tests for verification requests and reports

mod common;

use common::{ADMIN_ID, TestServer};
use reqwest::Method;
use serde_json::{Value, json};

fn submission() -> Value {
    json!({ "username": "alice", "fullName": "Alice Example", "bio": "photographer" })
}

#[tokio::test]
async fn test_verification_flow() {
    let server = TestServer::new().await;
    server.seed_user("alice").await;

    let response = server
        .get("/api/verify-request/status/alice", None)
        .await;
    assert_eq!(response.status(), 404);

    let response = server
        .post_json("/api/verify-request", "alice", submission())
        .await;
    assert_eq!(response.status(), 201);
    let request: Value = response.json().await.unwrap();
    let request_id = request["requestId"].as_str().unwrap();
    assert_eq!(request["status"], "pending");

    let response = server
        .post_json("/api/verify-request", "alice", submission())
        .await;
    assert_eq!(response.status(), 400);

    let response = server.get("/api/verify-request", Some("alice")).await;
    assert_eq!(response.status(), 403);
    let listed: Value = server
        .get("/api/verify-request", Some(ADMIN_ID))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let response = server
        .send_json(
            Method::PUT,
            &format!("/api/verify-request/{request_id}"),
            ADMIN_ID,
            json!({ "status": "maybe" }),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = server
        .send_json(
            Method::PUT,
            &format!("/api/verify-request/{request_id}"),
            ADMIN_ID,
            json!({ "status": "approved" }),
        )
        .await;
    assert_eq!(response.status(), 200);

    let status: Value = server
        .get("/api/verify-request/status/alice", None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "approved");
    assert_eq!(status["isVerified"], true);

    let profile: Value = server
        .get("/api/users/alice", None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(profile["isVerified"], true);
}

#[tokio::test]
async fn test_review_by_non_admin_is_forbidden() {
    let server = TestServer::new().await;

    let request: Value = server
        .post_json("/api/verify-request", "alice", submission())
        .await
        .json()
        .await
        .unwrap();
    let request_id = request["requestId"].as_str().unwrap();

    let response = server
        .send_json(
            Method::PUT,
            &format!("/api/verify-request/{request_id}"),
            "alice",
            json!({ "status": "approved" }),
        )
        .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_reports_are_listed_for_reporter() {
    let server = TestServer::new().await;

    let response = server
        .post_json(
            "/api/report",
            "alice",
            json!({ "targetId": "p1", "targetType": "post", "reason": "spam" }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let created: Value = response.json().await.unwrap();

    let response = server
        .post_json("/api/report", "alice", json!({ "targetId": "p1" }))
        .await;
    assert_eq!(response.status(), 400);

    let mine: Value = server
        .get("/api/report/my-reports", Some("alice"))
        .await
        .json()
        .await
        .unwrap();
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["reportId"], created["reportId"]);
    assert_eq!(mine[0]["status"], "pending");

    let theirs: Value = server
        .get("/api/report/my-reports", Some("bob"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(theirs, json!([]));
}
