//! Event fan-out to live connections.

use crate::connection::ClientConnection;
use relay_core::ServerEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use telemetry::metrics;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Broadcast group joined by operator connections.
pub const ADMIN_GROUP: &str = "admins";

/// Tracks live connections, their session subscriptions, and group
/// memberships. State is process-local and lost on restart; the session
/// store remains authoritative, so sessions can always be rejoined.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, Arc<ClientConnection>>>,
    /// Atomic counter so count queries skip the read lock.
    active_count: AtomicUsize,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            active_count: AtomicUsize::new(0),
        }
    }

    /// Register a connection.
    pub async fn add(&self, connection: Arc<ClientConnection>) {
        let mut conns = self.connections.write().await;
        if conns.insert(connection.id.clone(), connection).is_none() {
            let _ = self.active_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Remove a connection by id.
    pub async fn remove(&self, connection_id: &str) {
        let mut conns = self.connections.write().await;
        if conns.remove(connection_id).is_some() {
            let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Look up a connection.
    pub async fn get(&self, connection_id: &str) -> Option<Arc<ClientConnection>> {
        self.connections.read().await.get(connection_id).cloned()
    }

    /// Subscribe a connection to a session room.
    pub async fn join_session(&self, connection_id: &str, session_id: &str) {
        if let Some(conn) = self.get(connection_id).await {
            conn.bind_session(session_id);
        }
    }

    /// Remove a connection's session subscription.
    pub async fn leave_session(&self, connection_id: &str) {
        if let Some(conn) = self.get(connection_id).await {
            conn.clear_session();
        }
    }

    /// Add a connection to a broadcast group.
    pub async fn join_group(&self, connection_id: &str, group: &str) {
        if let Some(conn) = self.get(connection_id).await {
            conn.join_group(group);
        }
    }

    /// Deliver an event to a single connection.
    pub async fn send_to(&self, connection_id: &str, event: &ServerEvent) -> bool {
        let Some(conn) = self.get(connection_id).await else {
            return false;
        };
        let Some(payload) = serialize(event) else {
            return false;
        };
        let delivered = conn.send(payload);
        if !delivered {
            metrics().broadcast_drops.inc();
            warn!(conn_id = %conn.id, event = event.name(), "failed to send event (channel full or closed)");
        }
        delivered
    }

    /// Deliver an event to every member of a session room, sender included.
    /// Returns the number of deliveries; an empty room is a no-op.
    pub async fn broadcast_to_session(&self, session_id: &str, event: &ServerEvent) -> usize {
        self.broadcast_filtered(
            |c| c.session_id().as_deref() == Some(session_id),
            event,
            session_id,
        )
        .await
    }

    /// Deliver an event to every room member except one connection
    /// (typing indicators are never echoed to their sender).
    pub async fn broadcast_to_session_except(
        &self,
        session_id: &str,
        except: &str,
        event: &ServerEvent,
    ) -> usize {
        self.broadcast_filtered(
            |c| c.id != except && c.session_id().as_deref() == Some(session_id),
            event,
            session_id,
        )
        .await
    }

    /// Deliver an event to every member of a broadcast group.
    pub async fn broadcast_to_group(&self, group: &str, event: &ServerEvent) -> usize {
        self.broadcast_filtered(|c| c.in_group(group), event, group).await
    }

    /// Serialize once, fan out to matching connections.
    async fn broadcast_filtered(
        &self,
        filter: impl Fn(&ClientConnection) -> bool,
        event: &ServerEvent,
        label: &str,
    ) -> usize {
        let Some(payload) = serialize(event) else {
            return 0;
        };

        let conns = self.connections.read().await;
        let mut delivered = 0usize;
        for conn in conns.values() {
            if filter(conn) {
                if conn.send(Arc::clone(&payload)) {
                    delivered += 1;
                } else {
                    metrics().broadcast_drops.inc();
                    warn!(conn_id = %conn.id, label, event = event.name(), "dropped event (channel full or closed)");
                }
            }
        }
        debug!(event = event.name(), label, delivered, "broadcast event");
        delivered
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn serialize(event: &ServerEvent) -> Option<Arc<String>> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Arc::new(json)),
        Err(e) => {
            warn!(event = event.name(), error = %e, "failed to serialize event");
            None
        }
    }
}
