//! Shared helpers for the chat relay integration tests.

pub mod setup;
