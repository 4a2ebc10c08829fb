//! Chat session types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Placeholder email recorded when a visitor joins without one.
pub const PLACEHOLDER_EMAIL: &str = "no-email@provided.com";

/// Lifecycle status of a chat session.
///
/// The relay only ever sets `Active` (creation/resume) and `Closed`
/// (explicit close). `Waiting` is assigned by external callers, e.g. a
/// dashboard marking sessions with no operator yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Waiting,
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Waiting => "waiting",
            Self::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "waiting" => Some(Self::Waiting),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// A persistent support conversation bound to a visitor.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Opaque session id, stable across visitor reconnects.
    pub id: String,
    /// Visitor display name.
    #[validate(length(min = 1, max = 128))]
    pub customer_name: String,
    /// Visitor email, placeholder when omitted.
    pub customer_email: String,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Assigned operator id, if any.
    pub assigned_to: Option<String>,
    /// Messages from the visitor not yet seen by an operator.
    pub unread_count: i64,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
    /// Set when the session is closed.
    pub ended_at: Option<DateTime<Utc>>,
    /// Optional link to a dispute record.
    pub dispute_id: Option<String>,
}

impl ChatSession {
    /// Creates a new active session with a fresh id.
    pub fn new(customer_name: impl Into<String>, customer_email: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            customer_name: customer_name.into(),
            customer_email: customer_email.unwrap_or_else(|| PLACEHOLDER_EMAIL.to_string()),
            status: SessionStatus::Active,
            assigned_to: None,
            unread_count: 0,
            created_at: now,
            last_message_at: now,
            ended_at: None,
            dispute_id: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status == SessionStatus::Closed
    }
}

/// Partial update applied to a session via the REST patch endpoint.
///
/// Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPatch {
    pub status: Option<SessionStatus>,
    pub assigned_to: Option<String>,
    pub dispute_id: Option<String>,
}

impl SessionPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.assigned_to.is_none() && self.dispute_id.is_none()
    }
}

/// Filter for session listing.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub status: Option<SessionStatus>,
    pub assigned_to: Option<String>,
}
