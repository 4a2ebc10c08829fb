//! Unified error types for the chat relay.
//!
//! The taxonomy mirrors how failures surface to clients:
//! - validation errors: malformed or missing fields, rejected before any store access
//! - not-found errors: operations referencing a session unknown to the store
//! - storage errors: store unavailable or a write failed, operation aborted
//! - mail errors: the transcript hand-off to the email collaborator failed
//!
//! All relay failures are local to the triggering connection; they are never
//! broadcast and never crash the process.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the chat relay.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("mail error: {0}")]
    Mail(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::SessionNotFound(id.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn mail(msg: impl Into<String>) -> Self {
        Self::Mail(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::SessionNotFound(_) => 404,
            Self::Storage(_) => 500,
            Self::Serialization(_) => 400,
            Self::Mail(_) => 502,
            Self::Internal(_) => 500,
        }
    }

    /// Whether this error was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        self.http_status() < 500
    }
}
