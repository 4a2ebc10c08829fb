//! Common test setup functions.

use api::{router, AppState};
use axum::Router;
use relay::ClientConnection;
use std::sync::Arc;
use storage::{MemoryStore, SessionStore};
use tokio::sync::mpsc;

/// Test context with an in-memory store and a mock transcript mailer.
///
/// This exercises the production code paths by:
/// - Using the real Axum router with all middleware
/// - Using MemoryStore which implements the SessionStore trait
/// - Attaching channel-backed connections directly to the relay, bypassing
///   only the socket transport
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    pub router: Router,
}

impl TestContext {
    /// Create a new test context with all components initialized.
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone() as Arc<dyn SessionStore>, "mock");
        let router = router(state.clone());

        Self {
            store,
            state,
            router,
        }
    }

    /// Attach a channel-backed connection to the relay. The receiver yields
    /// the serialized events the connection would get over its socket.
    pub async fn connect(&self, id: &str) -> mpsc::Receiver<Arc<String>> {
        let (tx, rx) = mpsc::channel(64);
        let connection = Arc::new(ClientConnection::new(id.into(), tx));
        self.state.relay.connect(connection).await;
        rx
    }

    /// Set the store to fail writes (for error testing).
    pub fn set_store_failure(&self, should_fail: bool) {
        self.store.set_fail_writes(should_fail);
    }

    /// Count of messages persisted across all sessions.
    pub fn persisted_message_count(&self) -> usize {
        self.store.message_count()
    }
}

/// Pop the next event from a connection's receiver and parse the envelope.
pub fn recv_event(rx: &mut mpsc::Receiver<Arc<String>>) -> serde_json::Value {
    let raw = rx.try_recv().expect("expected a pending event");
    serde_json::from_str(&raw).expect("event should be valid JSON")
}

/// Assert the connection has no pending events.
pub fn assert_silent(rx: &mut mpsc::Receiver<Arc<String>>) {
    assert!(rx.try_recv().is_err(), "expected no pending events");
}
