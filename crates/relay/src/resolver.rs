//! Session resolution for `join_chat`.
//!
//! Visitors hand back whatever session id their browser kept in
//! localStorage. The id may be absent, the literal strings "null" or
//! "undefined", forged, or point at a session that has since been closed.
//! All of those resolve to a fresh session.

use relay_core::{ChatSession, Error, Result};
use storage::SessionStore;
use tracing::debug;
use validator::Validate;

/// Outcome of resolving a join request.
#[derive(Debug)]
pub struct ResolvedSession {
    pub session: ChatSession,
    /// True when an existing session record was reused.
    pub resumed: bool,
}

/// Ids that clients send when their storage held nothing useful.
fn is_absent(supplied: Option<&str>) -> bool {
    match supplied {
        None => true,
        Some(id) => {
            let id = id.trim();
            id.is_empty() || id == "null" || id == "undefined"
        }
    }
}

/// Decide the effective session for a join request.
///
/// A valid prior id reuses the existing record and refreshes its activity
/// timestamp; anything else creates a new active session. The resolved id is
/// always echoed back to the connection so the client can persist it.
pub async fn resolve_session(
    store: &dyn SessionStore,
    supplied_id: Option<&str>,
    customer_name: &str,
    customer_email: Option<String>,
) -> Result<ResolvedSession> {
    if !is_absent(supplied_id) {
        let id = supplied_id.unwrap_or_default().trim();
        if let Some(mut session) = store.find_session(id).await? {
            if !session.is_closed() {
                let now = chrono::Utc::now();
                store.touch_session(id, now).await?;
                session.last_message_at = now;
                debug!(session_id = %session.id, "resumed existing session");
                return Ok(ResolvedSession {
                    session,
                    resumed: true,
                });
            }
        }
    }

    let session = ChatSession::new(customer_name, customer_email);
    session
        .validate()
        .map_err(|e| Error::validation(e.to_string()))?;
    store.create_session(&session).await?;
    debug!(session_id = %session.id, customer = %session.customer_name, "created new session");

    Ok(ResolvedSession {
        session,
        resumed: false,
    })
}
