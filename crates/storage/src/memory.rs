//! In-memory session store.
//!
//! The second interchangeable backend: keeps everything in process memory.
//! Used by the test harness and by single-node demo deployments where
//! durability across restarts is not needed.

use crate::store::SessionStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use relay_core::{
    ChatMessage, ChatSession, Error, MessageStatus, Result, SessionFilter, SessionPatch,
    SessionStatus,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Session store backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<String, ChatSession>>,
    messages: Mutex<Vec<ChatMessage>>,
    /// Simulate store unavailability in tests.
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail, to exercise persistence-error paths.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(Error::storage("store unavailable"));
        }
        Ok(())
    }

    /// Number of persisted messages, across all sessions.
    pub fn message_count(&self) -> usize {
        self.messages.lock().len()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, session: &ChatSession) -> Result<()> {
        self.check_writable()?;
        self.sessions
            .lock()
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, id: &str) -> Result<Option<ChatSession>> {
        Ok(self.sessions.lock().get(id).cloned())
    }

    async fn touch_session(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        self.check_writable()?;
        if let Some(session) = self.sessions.lock().get_mut(id) {
            session.last_message_at = at;
        }
        Ok(())
    }

    async fn record_message(
        &self,
        session_id: &str,
        at: DateTime<Utc>,
        from_visitor: bool,
    ) -> Result<()> {
        self.check_writable()?;
        if let Some(session) = self.sessions.lock().get_mut(session_id) {
            session.last_message_at = at;
            if from_visitor {
                session.unread_count += 1;
            }
        }
        Ok(())
    }

    async fn assign_operator(&self, session_id: &str, admin_id: &str) -> Result<()> {
        self.check_writable()?;
        if let Some(session) = self.sessions.lock().get_mut(session_id) {
            session.assigned_to = Some(admin_id.to_string());
            session.unread_count = 0;
        }
        Ok(())
    }

    async fn close_session(&self, session_id: &str, at: DateTime<Utc>) -> Result<()> {
        self.check_writable()?;
        if let Some(session) = self.sessions.lock().get_mut(session_id) {
            session.status = SessionStatus::Closed;
            session.ended_at = Some(at);
        }
        Ok(())
    }

    async fn update_session(&self, id: &str, patch: &SessionPatch) -> Result<Option<ChatSession>> {
        self.check_writable()?;
        let mut sessions = self.sessions.lock();
        let Some(session) = sessions.get_mut(id) else {
            return Ok(None);
        };
        if let Some(status) = patch.status {
            session.status = status;
        }
        if let Some(assigned) = &patch.assigned_to {
            session.assigned_to = Some(assigned.clone());
        }
        if let Some(dispute) = &patch.dispute_id {
            session.dispute_id = Some(dispute.clone());
        }
        Ok(Some(session.clone()))
    }

    async fn list_sessions(&self, filter: &SessionFilter) -> Result<Vec<ChatSession>> {
        let sessions = self.sessions.lock();
        let mut result: Vec<ChatSession> = sessions
            .values()
            .filter(|s| filter.status.map_or(true, |status| s.status == status))
            .filter(|s| {
                filter
                    .assigned_to
                    .as_deref()
                    .map_or(true, |a| s.assigned_to.as_deref() == Some(a))
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        Ok(result)
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<()> {
        self.check_writable()?;
        self.messages.lock().push(message.clone());
        Ok(())
    }

    async fn session_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let messages = self.messages.lock();
        let mut result: Vec<ChatMessage> = messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(result)
    }

    async fn mark_read(&self, session_id: &str) -> Result<u64> {
        self.check_writable()?;
        let mut messages = self.messages.lock();
        let mut affected = 0;
        for message in messages
            .iter_mut()
            .filter(|m| m.session_id == session_id && m.status != MessageStatus::Read)
        {
            message.status = MessageStatus::Read;
            affected += 1;
        }
        Ok(affected)
    }

    async fn is_healthy(&self) -> bool {
        !self.fail_writes.load(Ordering::Relaxed)
    }
}
