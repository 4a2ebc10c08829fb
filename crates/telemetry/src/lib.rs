//! Internal telemetry for the chat relay.
//!
//! Structured logging via `tracing`, a component health registry for the
//! readiness endpoints, and in-process metrics counters.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::{health, HealthRegistry, HealthStatus};
pub use metrics::{metrics, Metrics};
pub use tracing_setup::{init_tracing, init_tracing_from_env};
