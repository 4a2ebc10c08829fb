//! End-to-end tests for the chat relay.
//!
//! These drive full conversations through `ChatRelay` with channel-backed
//! connections: the receivers yield exactly the serialized frames each
//! socket would get, so fan-out counts and payload shapes are asserted on
//! the real wire format.

use integration_tests::{
    fixtures,
    setup::{assert_silent, recv_event, TestContext},
};
use relay_core::ClientEvent;
use storage::SessionStore;

/// Scenario A: visitor joins with no session id, gets a fresh session,
/// sends a message, and the admin group hears a summary.
#[tokio::test]
async fn test_visitor_join_and_first_message() {
    let ctx = TestContext::new().await;
    let mut visitor = ctx.connect("visitor-1").await;
    let mut dashboard = ctx.connect("dashboard-1").await;

    ctx.state
        .relay
        .handle_event(
            "dashboard-1",
            ClientEvent::JoinAdmin {
                admin_id: "op-7".into(),
            },
        )
        .await
        .expect("admin join");

    ctx.state
        .relay
        .handle_event("visitor-1", fixtures::join_chat("Jane"))
        .await
        .expect("visitor join");

    let created = recv_event(&mut visitor);
    assert_eq!(created["event"], "session_created");
    let session_id = created["data"]["sessionId"]
        .as_str()
        .expect("session id")
        .to_string();

    let update = recv_event(&mut dashboard);
    assert_eq!(update["event"], "chat_update");
    assert_eq!(update["data"]["sessionId"], session_id.as_str());
    assert_eq!(update["data"]["customerName"], "Jane");

    ctx.state
        .relay
        .handle_event("visitor-1", fixtures::visitor_message(&session_id, "My card was charged twice"))
        .await
        .expect("send message");

    // The visitor's own room gets the message back.
    let message = recv_event(&mut visitor);
    assert_eq!(message["event"], "new_message");
    assert_eq!(message["data"]["text"], "My card was charged twice");
    assert_eq!(message["data"]["isUser"], true);
    assert_eq!(message["data"]["status"], "sent");

    // The admin group gets a summary.
    let summary = recv_event(&mut dashboard);
    assert_eq!(summary["event"], "customer_message");
    assert_eq!(summary["data"]["customerName"], "Jane");
    assert_eq!(summary["data"]["text"], "My card was charged twice");

    // Persisted with the unread counter advanced.
    let session = ctx
        .store
        .find_session(&session_id)
        .await
        .unwrap()
        .expect("session persisted");
    assert_eq!(session.unread_count, 1);
    assert_eq!(ctx.persisted_message_count(), 1);
}

/// Scenario B: operator takes the session, assignment is recorded, unread
/// resets, and both sides converse in the same room.
#[tokio::test]
async fn test_operator_takes_session_and_replies() {
    let ctx = TestContext::new().await;
    let mut visitor = ctx.connect("visitor-1").await;
    let mut operator = ctx.connect("operator-1").await;

    ctx.state
        .relay
        .handle_event("visitor-1", fixtures::join_chat("Jane"))
        .await
        .unwrap();
    let session_id = recv_event(&mut visitor)["data"]["sessionId"]
        .as_str()
        .unwrap()
        .to_string();

    ctx.state
        .relay
        .handle_event("visitor-1", fixtures::visitor_message(&session_id, "Hello?"))
        .await
        .unwrap();
    let _ = recv_event(&mut visitor);

    ctx.state
        .relay
        .handle_event(
            "operator-1",
            ClientEvent::AdminJoinSession {
                session_id: session_id.clone(),
                admin_id: "op-7".into(),
            },
        )
        .await
        .expect("operator join");

    // Both room members are told an agent joined.
    let joined = recv_event(&mut visitor);
    assert_eq!(joined["event"], "admin_joined");
    assert_eq!(joined["data"]["adminId"], "op-7");
    let joined = recv_event(&mut operator);
    assert_eq!(joined["event"], "admin_joined");

    let session = ctx.store.find_session(&session_id).await.unwrap().unwrap();
    assert_eq!(session.assigned_to.as_deref(), Some("op-7"));
    assert_eq!(session.unread_count, 0, "assignment resets unread");

    ctx.state
        .relay
        .handle_event(
            "operator-1",
            fixtures::operator_message(&session_id, "op-7", "Looking into it now"),
        )
        .await
        .expect("operator reply");

    for rx in [&mut visitor, &mut operator] {
        let reply = recv_event(rx);
        assert_eq!(reply["event"], "new_message");
        assert_eq!(reply["data"]["isUser"], false);
        assert_eq!(reply["data"]["adminId"], "op-7");
    }

    // Operator replies leave the unread counter alone.
    let session = ctx.store.find_session(&session_id).await.unwrap().unwrap();
    assert_eq!(session.unread_count, 0);
}

/// Scenario C: a returning visitor resumes their session; history survives
/// and no duplicate record appears.
#[tokio::test]
async fn test_visitor_resumes_session_after_reconnect() {
    let ctx = TestContext::new().await;
    let mut visitor = ctx.connect("visitor-1").await;

    ctx.state
        .relay
        .handle_event("visitor-1", fixtures::join_chat("Jane"))
        .await
        .unwrap();
    let session_id = recv_event(&mut visitor)["data"]["sessionId"]
        .as_str()
        .unwrap()
        .to_string();
    ctx.state
        .relay
        .handle_event("visitor-1", fixtures::visitor_message(&session_id, "first"))
        .await
        .unwrap();
    let _ = recv_event(&mut visitor);

    // Simulate a page reload: the socket drops, a new one joins with the
    // stored session id.
    ctx.state.relay.disconnect("visitor-1").await;
    let mut returning = ctx.connect("visitor-2").await;

    ctx.state
        .relay
        .handle_event("visitor-2", fixtures::rejoin_chat("Jane", &session_id))
        .await
        .unwrap();
    let echoed = recv_event(&mut returning);
    assert_eq!(echoed["event"], "session_created");
    assert_eq!(echoed["data"]["sessionId"], session_id.as_str());

    // History is intact and exactly one session exists.
    let messages = ctx.store.session_messages(&session_id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "first");
    let all = ctx
        .store
        .list_sessions(&relay_core::SessionFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);

    // The new connection is live in the old room.
    ctx.state
        .relay
        .handle_event("visitor-2", fixtures::visitor_message(&session_id, "still there?"))
        .await
        .unwrap();
    assert_eq!(recv_event(&mut returning)["data"]["text"], "still there?");
}

/// Scenario D: a message for an unknown session is rejected, delivered to
/// nobody, and persisted nowhere. Only the sender hears about it (via the
/// error surfaced to the transport).
#[tokio::test]
async fn test_unknown_session_message_is_rejected() {
    let ctx = TestContext::new().await;
    let mut visitor = ctx.connect("visitor-1").await;
    let mut dashboard = ctx.connect("dashboard-1").await;
    ctx.state
        .relay
        .handle_event(
            "dashboard-1",
            ClientEvent::JoinAdmin {
                admin_id: "op-7".into(),
            },
        )
        .await
        .unwrap();

    let err = ctx
        .state
        .relay
        .handle_event(
            "visitor-1",
            fixtures::visitor_message("forged-session", "sneaky"),
        )
        .await
        .expect_err("unknown session must be rejected");
    assert_eq!(err.http_status(), 404);

    assert_silent(&mut visitor);
    assert_silent(&mut dashboard);
    assert_eq!(ctx.persisted_message_count(), 0);
}

/// Typing indicators reach the other room members only and are never
/// persisted.
#[tokio::test]
async fn test_typing_indicator_flow() {
    let ctx = TestContext::new().await;
    let mut visitor = ctx.connect("visitor-1").await;
    let mut operator = ctx.connect("operator-1").await;

    ctx.state
        .relay
        .handle_event("visitor-1", fixtures::join_chat("Jane"))
        .await
        .unwrap();
    let session_id = recv_event(&mut visitor)["data"]["sessionId"]
        .as_str()
        .unwrap()
        .to_string();
    ctx.state
        .relay
        .handle_event(
            "operator-1",
            ClientEvent::AdminJoinSession {
                session_id: session_id.clone(),
                admin_id: "op-7".into(),
            },
        )
        .await
        .unwrap();
    let _ = recv_event(&mut visitor);
    let _ = recv_event(&mut operator);

    ctx.state
        .relay
        .handle_event(
            "visitor-1",
            ClientEvent::Typing {
                session_id: session_id.clone(),
                is_typing: true,
                is_admin: false,
            },
        )
        .await
        .unwrap();

    let typing = recv_event(&mut operator);
    assert_eq!(typing["event"], "typing_indicator");
    assert_eq!(typing["data"]["isTyping"], true);
    assert_eq!(typing["data"]["isAdmin"], false);
    assert_silent(&mut visitor);
    assert_eq!(ctx.persisted_message_count(), 0);
}

/// Closing a chat notifies the room, stamps the record, and detaches the
/// closer; resuming the closed id starts fresh.
#[tokio::test]
async fn test_close_then_rejoin_starts_new_session() {
    let ctx = TestContext::new().await;
    let mut visitor = ctx.connect("visitor-1").await;

    ctx.state
        .relay
        .handle_event("visitor-1", fixtures::join_chat("Jane"))
        .await
        .unwrap();
    let session_id = recv_event(&mut visitor)["data"]["sessionId"]
        .as_str()
        .unwrap()
        .to_string();

    ctx.state
        .relay
        .handle_event(
            "visitor-1",
            ClientEvent::CloseChat {
                session_id: session_id.clone(),
            },
        )
        .await
        .unwrap();
    assert_eq!(recv_event(&mut visitor)["event"], "chat_closed");

    let closed = ctx.store.find_session(&session_id).await.unwrap().unwrap();
    assert!(closed.is_closed());
    assert!(closed.ended_at.is_some());

    // Joining again with the closed id yields a different session.
    ctx.state
        .relay
        .handle_event("visitor-1", fixtures::rejoin_chat("Jane", &session_id))
        .await
        .unwrap();
    let fresh = recv_event(&mut visitor);
    assert_ne!(fresh["data"]["sessionId"], session_id.as_str());
}

/// A store outage surfaces as an error to the sender and suppresses all
/// delivery.
#[tokio::test]
async fn test_store_outage_aborts_send() {
    let ctx = TestContext::new().await;
    let mut visitor = ctx.connect("visitor-1").await;

    ctx.state
        .relay
        .handle_event("visitor-1", fixtures::join_chat("Jane"))
        .await
        .unwrap();
    let session_id = recv_event(&mut visitor)["data"]["sessionId"]
        .as_str()
        .unwrap()
        .to_string();

    ctx.set_store_failure(true);
    let err = ctx
        .state
        .relay
        .handle_event("visitor-1", fixtures::visitor_message(&session_id, "lost"))
        .await
        .expect_err("write failure must abort");
    assert_eq!(err.http_status(), 500);
    assert_silent(&mut visitor);

    // Recovery: the same session keeps working once the store is back.
    ctx.set_store_failure(false);
    ctx.state
        .relay
        .handle_event("visitor-1", fixtures::visitor_message(&session_id, "retry"))
        .await
        .expect("store recovered");
    assert_eq!(recv_event(&mut visitor)["data"]["text"], "retry");
    assert_eq!(ctx.persisted_message_count(), 1);
}
