//! Collaborator REST endpoints for the operator dashboard and the dispute
//! portal backend.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use relay_core::{ChatSession, SessionFilter, SessionPatch, SessionStatus};
use serde::Deserialize;
use tracing::info;

use crate::response::{ApiError, SessionDetailResponse, TranscriptResponse};
use crate::state::AppState;

/// Query parameters for session listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<String>,
    pub assigned_to: Option<String>,
}

/// GET /api/chat/sessions - list sessions, newest activity first.
pub async fn list_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ChatSession>>, ApiError> {
    let status = match query.status.as_deref() {
        None => None,
        Some(raw) => Some(
            SessionStatus::parse(raw)
                .ok_or_else(|| ApiError::bad_request(format!("unknown status: {raw}")))?,
        ),
    };

    let filter = SessionFilter {
        status,
        assigned_to: query.assigned_to,
    };
    let sessions = state.store.list_sessions(&filter).await?;
    Ok(Json(sessions))
}

/// GET /api/chat/sessions/{id} - session plus ordered message history.
pub async fn detail_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionDetailResponse>, ApiError> {
    let session = state
        .store
        .find_session(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("session not found: {id}")))?;
    let messages = state.store.session_messages(&id).await?;

    Ok(Json(SessionDetailResponse { session, messages }))
}

/// PATCH /api/chat/sessions/{id} - partial update (status / assignment /
/// dispute link). Absent fields are left untouched.
pub async fn patch_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<SessionPatch>,
) -> Result<Json<ChatSession>, ApiError> {
    if patch.is_empty() {
        return Err(ApiError::bad_request("patch body has no fields"));
    }

    let updated = state
        .store
        .update_session(&id, &patch)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("session not found: {id}")))?;

    info!(session_id = %id, "session patched");
    Ok(Json(updated))
}

/// POST /api/chat/sessions/{id}/transcript - format the session history and
/// hand it off to the email service.
pub async fn transcript_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let session = state
        .store
        .find_session(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("session not found: {id}")))?;
    let messages = state.store.session_messages(&id).await?;

    state.mailer.send_transcript(&session, &messages).await?;

    info!(session_id = %id, recipient = %session.customer_email, "transcript sent");
    Ok(Json(TranscriptResponse {
        success: true,
        recipient: session.customer_email,
        message_count: messages.len(),
    }))
}
