//! The session store access contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_core::{ChatMessage, ChatSession, Result, SessionFilter, SessionPatch};

/// Persistent record of chat sessions and messages.
///
/// The store is the durable source of truth; the relay holds only a
/// transient index of live connections. Every method is a suspension point:
/// between issue and completion the in-memory registry may have changed, so
/// callers must tolerate fanning out to a now-empty room afterwards.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a freshly created session.
    async fn create_session(&self, session: &ChatSession) -> Result<()>;

    /// Look up a session by id.
    async fn find_session(&self, id: &str) -> Result<Option<ChatSession>>;

    /// Refresh `last_message_at` when a visitor resumes a session.
    async fn touch_session(&self, id: &str, at: DateTime<Utc>) -> Result<()>;

    /// Update the owning session after a message: advance `last_message_at`
    /// and, when the sender is the visitor, increment the unread counter.
    async fn record_message(
        &self,
        session_id: &str,
        at: DateTime<Utc>,
        from_visitor: bool,
    ) -> Result<()>;

    /// Record the operator assignment and reset the unread counter to zero.
    async fn assign_operator(&self, session_id: &str, admin_id: &str) -> Result<()>;

    /// Transition the session to closed and stamp `ended_at`. Re-stamps when
    /// the session is already closed; never errors for that case.
    async fn close_session(&self, session_id: &str, at: DateTime<Utc>) -> Result<()>;

    /// Apply a partial update (status / assignment / dispute link).
    /// Returns the updated session, or `None` when the id is unknown.
    async fn update_session(&self, id: &str, patch: &SessionPatch) -> Result<Option<ChatSession>>;

    /// List sessions, optionally filtered, newest activity first.
    async fn list_sessions(&self, filter: &SessionFilter) -> Result<Vec<ChatSession>>;

    /// Append a message. Messages are never mutated afterwards except for
    /// the bulk read transition.
    async fn append_message(&self, message: &ChatMessage) -> Result<()>;

    /// Ordered message history for a session, timestamp ascending.
    async fn session_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>>;

    /// Transition every non-read message in the session to read.
    /// Returns the number of affected messages; idempotent.
    async fn mark_read(&self, session_id: &str) -> Result<u64>;

    /// Cheap health probe for the readiness endpoint.
    async fn is_healthy(&self) -> bool;
}
