//! Core types, wire events, and errors for the chat relay.

pub mod error;
pub mod events;
pub mod message;
pub mod session;

pub use error::{Error, Result};
pub use events::*;
pub use message::*;
pub use session::*;
