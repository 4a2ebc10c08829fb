//! Real-time chat relay: connection registry, session resolution, message
//! fan-out, and presence/control signals.
//!
//! The relay holds only a transient index of live connections; the session
//! store is the durable source of truth. One [`ChatRelay`] instance is
//! constructed at startup and injected into the transport layer.

pub mod connection;
pub mod registry;
pub mod relay;
pub mod resolver;

pub use connection::ClientConnection;
pub use registry::{ConnectionRegistry, ADMIN_GROUP};
pub use relay::ChatRelay;
pub use resolver::{resolve_session, ResolvedSession};
