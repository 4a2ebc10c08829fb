//! Tests for the collaborator REST endpoints.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};
use relay_core::SessionStatus;
use storage::SessionStore;

#[tokio::test]
async fn test_list_sessions_empty() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/api/chat/sessions").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body.as_array().map(|a| a.len()), Some(0));
}

#[tokio::test]
async fn test_list_sessions_newest_activity_first() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let older = fixtures::seed_session(ctx.store.as_ref(), "Alice", &[]).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let newer = fixtures::seed_session(ctx.store.as_ref(), "Bob", &[("hi", true)]).await;

    let response = server.get("/api/chat/sessions").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let sessions = body.as_array().expect("array body");
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0]["id"], newer.id.as_str());
    assert_eq!(sessions[1]["id"], older.id.as_str());
}

#[tokio::test]
async fn test_list_sessions_filters() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let open = fixtures::seed_session(ctx.store.as_ref(), "Alice", &[]).await;
    let closed = fixtures::seed_session(ctx.store.as_ref(), "Bob", &[]).await;
    ctx.store
        .close_session(&closed.id, chrono::Utc::now())
        .await
        .unwrap();
    ctx.store.assign_operator(&open.id, "op-7").await.unwrap();

    let response = server.get("/api/chat/sessions?status=closed").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], closed.id.as_str());

    let response = server.get("/api/chat/sessions?assignedTo=op-7").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], open.id.as_str());
}

#[tokio::test]
async fn test_list_sessions_rejects_unknown_status() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/api/chat/sessions?status=archived").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("archived"));
}

#[tokio::test]
async fn test_session_detail_includes_ordered_history() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let session = fixtures::seed_session(
        ctx.store.as_ref(),
        "Jane",
        &[("first", true), ("second", false), ("third", true)],
    )
    .await;

    let response = server
        .get(&format!("/api/chat/sessions/{}", session.id))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["session"]["id"], session.id.as_str());
    assert_eq!(body["session"]["customerName"], "Jane");

    let messages = body["messages"].as_array().expect("messages array");
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0]["text"], "first");
    assert_eq!(messages[1]["text"], "second");
    assert_eq!(messages[2]["text"], "third");
}

#[tokio::test]
async fn test_session_detail_unknown_returns_404() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/api/chat/sessions/no-such-id").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_patch_session_updates_status_and_assignment() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let session = fixtures::seed_session(ctx.store.as_ref(), "Jane", &[]).await;

    let response = server
        .patch(&format!("/api/chat/sessions/{}", session.id))
        .json(&serde_json::json!({
            "status": "waiting",
            "assignedTo": "op-9"
        }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "waiting");
    assert_eq!(body["assignedTo"], "op-9");

    let stored = ctx.store.find_session(&session.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SessionStatus::Waiting);
    assert_eq!(stored.assigned_to.as_deref(), Some("op-9"));
}

#[tokio::test]
async fn test_patch_unknown_session_returns_404() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .patch("/api/chat/sessions/no-such-id")
        .json(&serde_json::json!({ "status": "closed" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_patch_with_empty_body_is_rejected() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let session = fixtures::seed_session(ctx.store.as_ref(), "Jane", &[]).await;

    let response = server
        .patch(&format!("/api/chat/sessions/{}", session.id))
        .json(&serde_json::json!({}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transcript_hand_off_in_mock_mode() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let session = fixtures::seed_session(
        ctx.store.as_ref(),
        "Jane",
        &[("I was double charged", true), ("Refund issued", false)],
    )
    .await;

    let response = server
        .post(&format!("/api/chat/sessions/{}/transcript", session.id))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["recipient"], "jane@example.com");
    assert_eq!(body["messageCount"], 2);
}

#[tokio::test]
async fn test_transcript_unknown_session_returns_404() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.post("/api/chat/sessions/no-such-id/transcript").await;
    response.assert_status(StatusCode::NOT_FOUND);
}
