//! The message relay: persistence plus fan-out for every chat event.

use crate::registry::{ConnectionRegistry, ADMIN_GROUP};
use crate::resolver::resolve_session;
use chrono::Utc;
use relay_core::{ChatMessage, ClientEvent, Error, Result, ServerEvent};
use std::sync::Arc;
use storage::SessionStore;
use telemetry::metrics;
use tracing::{debug, info};

/// Text delivered to the visitor room when an operator joins.
const OPERATOR_JOINED_MESSAGE: &str = "An agent has joined the chat";

/// The relay instance: constructed once at startup and injected into the
/// transport layer. Owns the connection registry; persists through the
/// injected session store.
///
/// Every handler follows persist-then-broadcast: a failed store write aborts
/// the operation before any fan-out, and the error is reported to the
/// triggering connection only. Per-session delivery order matches persist
/// order as long as events for one session are handled one at a time;
/// concurrent senders to the same session fall back to store-assigned
/// timestamps (accepted weak ordering).
pub struct ChatRelay {
    registry: ConnectionRegistry,
    store: Arc<dyn SessionStore>,
}

impl ChatRelay {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            store,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Register a freshly opened transport connection.
    pub async fn connect(&self, connection: Arc<crate::ClientConnection>) {
        debug!(conn_id = %connection.id, "connection opened");
        self.registry.add(connection).await;
        metrics().connections_opened.inc();
        metrics()
            .active_connections
            .set(self.registry.connection_count() as u64);
    }

    /// Drop a connection after its transport closed. In-flight store
    /// operations complete on their own; their fan-out simply finds an
    /// emptier room.
    pub async fn disconnect(&self, connection_id: &str) {
        debug!(conn_id = %connection_id, "connection closed");
        self.registry.remove(connection_id).await;
        metrics().connections_closed.inc();
        metrics()
            .active_connections
            .set(self.registry.connection_count() as u64);
    }

    /// Dispatch one inbound event. Errors are returned to the caller, which
    /// surfaces them to the sending connection only.
    pub async fn handle_event(&self, connection_id: &str, event: ClientEvent) -> Result<()> {
        match event {
            ClientEvent::JoinChat {
                session_id,
                customer_name,
                customer_email,
            } => {
                self.handle_join_chat(connection_id, session_id, customer_name, customer_email)
                    .await
            }
            ClientEvent::SendMessage {
                session_id,
                text,
                is_user,
                admin_id,
            } => {
                self.handle_send_message(connection_id, session_id, text, is_user, admin_id)
                    .await
            }
            ClientEvent::JoinAdmin { admin_id } => {
                self.handle_join_admin(connection_id, admin_id).await
            }
            ClientEvent::AdminJoinSession {
                session_id,
                admin_id,
            } => {
                self.handle_admin_join_session(connection_id, session_id, admin_id)
                    .await
            }
            ClientEvent::Typing {
                session_id,
                is_typing,
                is_admin,
            } => {
                self.handle_typing(connection_id, session_id, is_typing, is_admin)
                    .await
            }
            ClientEvent::MarkRead { session_id } => {
                self.handle_mark_read(connection_id, session_id).await
            }
            ClientEvent::CloseChat { session_id } => {
                self.handle_close_chat(connection_id, session_id).await
            }
        }
    }

    /// Resolve or create the visitor's session and subscribe the connection
    /// to its room. The resolved id is always echoed back; the admin group
    /// hears about new and resumed sessions so dashboards can refresh.
    async fn handle_join_chat(
        &self,
        connection_id: &str,
        session_id: Option<String>,
        customer_name: String,
        customer_email: Option<String>,
    ) -> Result<()> {
        if customer_name.trim().is_empty() {
            return Err(Error::validation("customerName is required"));
        }

        let resolved = resolve_session(
            self.store.as_ref(),
            session_id.as_deref(),
            customer_name.trim(),
            customer_email,
        )
        .await?;

        if resolved.resumed {
            metrics().sessions_resumed.inc();
        } else {
            metrics().sessions_created.inc();
        }

        let session = resolved.session;
        self.registry.join_session(connection_id, &session.id).await;
        let _ = self
            .registry
            .send_to(
                connection_id,
                &ServerEvent::SessionCreated {
                    session_id: session.id.clone(),
                },
            )
            .await;

        let _ = self
            .registry
            .broadcast_to_group(
                ADMIN_GROUP,
                &ServerEvent::ChatUpdate {
                    session_id: session.id.clone(),
                    customer_name: session.customer_name.clone(),
                },
            )
            .await;

        info!(
            session_id = %session.id,
            customer = %session.customer_name,
            resumed = resolved.resumed,
            "visitor joined chat"
        );
        Ok(())
    }

    /// The send-path: validate, persist, update the owning session, then fan
    /// out to the session room (sender included) and, for visitor messages,
    /// summarize to the admin group.
    async fn handle_send_message(
        &self,
        connection_id: &str,
        session_id: String,
        text: String,
        is_user: bool,
        admin_id: Option<String>,
    ) -> Result<()> {
        if session_id.trim().is_empty() {
            metrics().messages_rejected.inc();
            return Err(Error::validation("sessionId is required"));
        }
        if text.is_empty() {
            metrics().messages_rejected.inc();
            return Err(Error::validation("text is required"));
        }
        if !is_user && admin_id.is_none() {
            metrics().messages_rejected.inc();
            return Err(Error::validation("adminId is required for operator messages"));
        }

        let session = self
            .store
            .find_session(&session_id)
            .await?
            .ok_or_else(|| {
                metrics().messages_rejected.inc();
                Error::session_not_found(session_id.clone())
            })?;

        let mut message = ChatMessage::new(&session_id, text, is_user);
        if is_user {
            message = message.with_connection(connection_id);
        }
        if let Some(admin) = admin_id {
            message = message.with_admin(admin);
        }

        // Persist before any delivery: a failed write means nobody sees the
        // message, not a partial fan-out.
        self.store.append_message(&message).await?;
        self.store
            .record_message(&session_id, message.timestamp, is_user)
            .await?;

        let delivered = self
            .registry
            .broadcast_to_session(&session_id, &ServerEvent::NewMessage(message.clone()))
            .await;

        if is_user {
            let _ = self
                .registry
                .broadcast_to_group(
                    ADMIN_GROUP,
                    &ServerEvent::CustomerMessage {
                        session_id: session_id.clone(),
                        customer_name: session.customer_name.clone(),
                        text: message.text.clone(),
                    },
                )
                .await;
        }

        metrics().messages_relayed.inc();
        debug!(
            session_id = %session_id,
            message_id = %message.id,
            is_user,
            delivered,
            "message relayed"
        );
        Ok(())
    }

    /// Subscribe an operator connection to the admin broadcast group.
    async fn handle_join_admin(&self, connection_id: &str, admin_id: String) -> Result<()> {
        if admin_id.trim().is_empty() {
            return Err(Error::validation("adminId is required"));
        }
        self.registry.join_group(connection_id, ADMIN_GROUP).await;
        info!(conn_id = %connection_id, admin_id = %admin_id, "operator joined admin group");
        Ok(())
    }

    /// Operator takes a session: join its room, record the assignment,
    /// reset the unread counter, and tell the visitor.
    async fn handle_admin_join_session(
        &self,
        connection_id: &str,
        session_id: String,
        admin_id: String,
    ) -> Result<()> {
        if session_id.trim().is_empty() || admin_id.trim().is_empty() {
            return Err(Error::validation("sessionId and adminId are required"));
        }

        if self.store.find_session(&session_id).await?.is_none() {
            return Err(Error::session_not_found(session_id));
        }

        self.store.assign_operator(&session_id, &admin_id).await?;
        self.registry.join_session(connection_id, &session_id).await;

        let _ = self
            .registry
            .broadcast_to_session(
                &session_id,
                &ServerEvent::AdminJoined {
                    admin_id: admin_id.clone(),
                    message: OPERATOR_JOINED_MESSAGE.to_string(),
                },
            )
            .await;

        metrics().operators_joined.inc();
        info!(session_id = %session_id, admin_id = %admin_id, "operator joined session");
        Ok(())
    }

    /// Ephemeral typing signal: fan out to the other room members, never
    /// echoed to the sender, never persisted.
    async fn handle_typing(
        &self,
        connection_id: &str,
        session_id: String,
        is_typing: bool,
        is_admin: bool,
    ) -> Result<()> {
        if session_id.trim().is_empty() {
            return Err(Error::validation("sessionId is required"));
        }
        if self.store.find_session(&session_id).await?.is_none() {
            return Err(Error::session_not_found(session_id));
        }

        let _ = self
            .registry
            .broadcast_to_session_except(
                &session_id,
                connection_id,
                &ServerEvent::TypingIndicator { is_typing, is_admin },
            )
            .await;

        metrics().typing_signals.inc();
        Ok(())
    }

    /// Bulk sent -> read transition, then notify the room.
    async fn handle_mark_read(&self, _connection_id: &str, session_id: String) -> Result<()> {
        if session_id.trim().is_empty() {
            return Err(Error::validation("sessionId is required"));
        }
        if self.store.find_session(&session_id).await?.is_none() {
            return Err(Error::session_not_found(session_id));
        }

        let affected = self.store.mark_read(&session_id).await?;
        metrics().messages_marked_read.inc_by(affected);

        let _ = self
            .registry
            .broadcast_to_session(
                &session_id,
                &ServerEvent::MessagesRead {
                    session_id: session_id.clone(),
                },
            )
            .await;

        debug!(session_id = %session_id, affected, "messages marked read");
        Ok(())
    }

    /// Close the session, notify the room, and drop the closer's
    /// subscription. Closing an already-closed session re-stamps `ended_at`
    /// and is never an error.
    async fn handle_close_chat(&self, connection_id: &str, session_id: String) -> Result<()> {
        if session_id.trim().is_empty() {
            return Err(Error::validation("sessionId is required"));
        }
        if self.store.find_session(&session_id).await?.is_none() {
            return Err(Error::session_not_found(session_id));
        }

        self.store.close_session(&session_id, Utc::now()).await?;

        let _ = self
            .registry
            .broadcast_to_session(
                &session_id,
                &ServerEvent::ChatClosed {
                    session_id: session_id.clone(),
                },
            )
            .await;

        self.registry.leave_session(connection_id).await;
        metrics().sessions_closed.inc();
        info!(session_id = %session_id, "session closed");
        Ok(())
    }
}

impl std::fmt::Debug for ChatRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRelay")
            .field("connections", &self.registry.connection_count())
            .finish()
    }
}
