//! Application state shared across handlers.

use crate::mailer::TranscriptMailer;
use relay::ChatRelay;
use std::sync::Arc;
use storage::SessionStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The relay instance; owns the connection registry.
    pub relay: Arc<ChatRelay>,
    /// Session store (SQLite in production, in-memory in tests).
    pub store: Arc<dyn SessionStore>,
    /// Transcript hand-off client.
    pub mailer: TranscriptMailer,
}

impl AppState {
    pub fn new(store: Arc<dyn SessionStore>, email_url: impl Into<String>) -> Self {
        Self {
            relay: Arc::new(ChatRelay::new(store.clone())),
            store,
            mailer: TranscriptMailer::new(email_url),
        }
    }
}
