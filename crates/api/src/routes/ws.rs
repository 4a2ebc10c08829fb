//! WebSocket transport endpoint.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use relay::ClientConnection;
use relay_core::{ClientEvent, ServerEvent};
use std::sync::Arc;
use telemetry::metrics;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::state::AppState;

/// Outbound channel capacity per connection. A member that falls this far
/// behind starts losing events rather than stalling the room.
const OUTBOUND_BUFFER: usize = 256;

/// GET /ws - upgrade to the chat transport.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4().to_string();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Arc<String>>(OUTBOUND_BUFFER);

    let connection = Arc::new(ClientConnection::new(connection_id.clone(), tx));
    state.relay.connect(connection).await;

    // Writer task: drain the outbound channel into the socket.
    let write_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if sink
                .send(Message::Text(payload.as_str().to_owned()))
                .await
                .is_err()
            {
                break;
            }
        }
        let _ = sink.close().await;
    });

    // Reader loop: parse inbound frames and dispatch them to the relay.
    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                debug!(conn_id = %connection_id, error = %e, "socket error");
                break;
            }
        };

        match frame {
            Message::Text(raw) => handle_frame(&state, &connection_id, &raw).await,
            Message::Close(_) => break,
            // Pings are answered by the protocol layer; binary frames are
            // not part of the wire protocol.
            Message::Binary(_) => {
                metrics().frames_rejected.inc();
                send_error(&state, &connection_id, "binary frames are not supported").await;
            }
            _ => {}
        }
    }

    state.relay.disconnect(&connection_id).await;
    write_task.abort();
}

async fn handle_frame(state: &AppState, connection_id: &str, raw: &str) {
    let event: ClientEvent = match serde_json::from_str(raw) {
        Ok(event) => event,
        Err(e) => {
            metrics().frames_rejected.inc();
            debug!(conn_id = %connection_id, error = %e, "unparseable frame");
            send_error(state, connection_id, &format!("invalid frame: {e}")).await;
            return;
        }
    };

    if let Err(e) = state.relay.handle_event(connection_id, event).await {
        if !e.is_client_error() {
            warn!(conn_id = %connection_id, error = %e, "event handling failed");
        }
        send_error(state, connection_id, &e.to_string()).await;
    }
}

/// Deliver an error event to the triggering connection only.
async fn send_error(state: &AppState, connection_id: &str, message: &str) {
    let _ = state
        .relay
        .registry()
        .send_to(
            connection_id,
            &ServerEvent::Error {
                message: message.to_string(),
            },
        )
        .await;
}
