//! Session store contract and adapters for the chat relay.
//!
//! The relay is written once against the [`SessionStore`] trait; each storage
//! backend is an interchangeable adapter. `SqliteStore` is the durable
//! production backend, `MemoryStore` the in-process one used by tests and
//! single-node demo deployments.

pub mod config;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use config::*;
pub use memory::*;
pub use sqlite::*;
pub use store::*;
