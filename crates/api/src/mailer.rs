//! Transcript hand-off to the external email collaborator.
//!
//! Calls the portal's email service to deliver a plain-text transcript of a
//! session. A mail failure is the caller's problem to surface; the relay
//! never retries and never blocks chat traffic on it.

use chrono::SecondsFormat;
use relay_core::{ChatMessage, ChatSession, Error};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Email service client.
///
/// Posts transcripts to the email service's `/api/email/send` endpoint.
/// Mock mode (empty base url or `"mock"`) skips the network call so tests
/// and local development need no running email service.
#[derive(Clone)]
pub struct TranscriptMailer {
    /// Email service URL (e.g., "http://email-service:3002")
    base_url: String,
    http_client: reqwest::Client,
    mock_mode: bool,
}

/// Request body for the email service.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptRequest {
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl TranscriptMailer {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let mock_mode = base_url.is_empty() || base_url == "mock";

        Self {
            base_url,
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .expect("Failed to create HTTP client"),
            mock_mode,
        }
    }

    pub fn is_mock(&self) -> bool {
        self.mock_mode
    }

    /// Format a session's history as a plain-text transcript, one line per
    /// message, oldest first.
    pub fn format_transcript(session: &ChatSession, messages: &[ChatMessage]) -> String {
        let mut lines = Vec::with_capacity(messages.len() + 2);
        lines.push(format!(
            "Chat transcript for {} ({})",
            session.customer_name, session.customer_email
        ));
        lines.push(String::new());
        for message in messages {
            let who = if message.is_user {
                "Customer"
            } else {
                "Agent"
            };
            lines.push(format!(
                "[{}] {}: {}",
                message.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                who,
                message.text
            ));
        }
        lines.join("\n")
    }

    /// Send a transcript to the session's customer email.
    pub async fn send_transcript(
        &self,
        session: &ChatSession,
        messages: &[ChatMessage],
    ) -> Result<(), Error> {
        let request = TranscriptRequest {
            to: session.customer_email.clone(),
            subject: format!("Your chat transcript ({})", session.id),
            text: Self::format_transcript(session, messages),
        };

        if self.mock_mode {
            debug!(session_id = %session.id, to = %request.to, "mock transcript send");
            return Ok(());
        }

        let url = format!("{}/api/email/send", self.base_url);
        debug!(url = %url, session_id = %session.id, "sending transcript");

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Email service request failed");
                Error::mail(format!("email service unavailable: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Email service returned error");
            return Err(Error::mail(format!(
                "email service returned {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}
