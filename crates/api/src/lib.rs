//! HTTP and WebSocket API layer for the chat relay.

pub mod mailer;
pub mod response;
pub mod routes;
pub mod state;

pub use mailer::TranscriptMailer;
pub use routes::router;
pub use state::AppState;
