//! Per-connection transport state.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A live transport connection.
///
/// Holds the outbound channel to the connection's socket write task, the
/// session it is subscribed to (zero or one for visitors), and the broadcast
/// groups it belongs to (operators join the admin group). All of this is
/// ephemeral and rebuilt on every connect.
pub struct ClientConnection {
    /// Unique connection id.
    pub id: String,
    /// Send channel to the connection's socket write task.
    tx: mpsc::Sender<Arc<String>>,
    /// Bound session id, set on `join_chat` / `admin_join_session`.
    session_id: Mutex<Option<String>>,
    /// Broadcast group memberships.
    groups: Mutex<HashSet<String>>,
    /// Count of payloads dropped due to a full or closed channel.
    dropped: AtomicU64,
}

impl ClientConnection {
    pub fn new(id: String, tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            id,
            tx,
            session_id: Mutex::new(None),
            groups: Mutex::new(HashSet::new()),
            dropped: AtomicU64::new(0),
        }
    }

    /// Subscribe this connection to a session room.
    pub fn bind_session(&self, session_id: impl Into<String>) {
        *self.session_id.lock() = Some(session_id.into());
    }

    /// Remove the session subscription.
    pub fn clear_session(&self) {
        *self.session_id.lock() = None;
    }

    /// The currently bound session id.
    pub fn session_id(&self) -> Option<String> {
        self.session_id.lock().clone()
    }

    /// Add a broadcast group membership.
    pub fn join_group(&self, group: impl Into<String>) {
        let _ = self.groups.lock().insert(group.into());
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.lock().contains(group)
    }

    /// Send a serialized event to the connection.
    ///
    /// Returns `false` when the channel is full or closed; the payload is
    /// dropped and counted, never blocked on.
    pub fn send(&self, payload: Arc<String>) -> bool {
        if self.tx.try_send(payload).is_ok() {
            true
        } else {
            let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Total payloads dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
