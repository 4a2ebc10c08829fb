//! Internal metrics collection.
//!
//! Counters are process-local and exposed through the health endpoint; the
//! relay has no external metrics backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        // Saturating: a disconnect racing startup must not wrap.
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(1))
            });
    }
}

/// Collected metrics for the chat relay.
#[derive(Debug, Default)]
pub struct Metrics {
    // Transport
    pub connections_opened: Counter,
    pub connections_closed: Counter,
    pub frames_rejected: Counter,
    pub broadcast_drops: Counter,

    // Sessions
    pub sessions_created: Counter,
    pub sessions_resumed: Counter,
    pub sessions_closed: Counter,
    pub operators_joined: Counter,

    // Messages
    pub messages_relayed: Counter,
    pub messages_rejected: Counter,
    pub messages_marked_read: Counter,
    pub typing_signals: Counter,

    // Gauges
    pub active_connections: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            connections_opened: self.connections_opened.get(),
            connections_closed: self.connections_closed.get(),
            frames_rejected: self.frames_rejected.get(),
            broadcast_drops: self.broadcast_drops.get(),
            sessions_created: self.sessions_created.get(),
            sessions_resumed: self.sessions_resumed.get(),
            sessions_closed: self.sessions_closed.get(),
            operators_joined: self.operators_joined.get(),
            messages_relayed: self.messages_relayed.get(),
            messages_rejected: self.messages_rejected.get(),
            messages_marked_read: self.messages_marked_read.get(),
            typing_signals: self.typing_signals.get(),
            active_connections: self.active_connections.get(),
        }
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub connections_opened: u64,
    pub connections_closed: u64,
    pub frames_rejected: u64,
    pub broadcast_drops: u64,
    pub sessions_created: u64,
    pub sessions_resumed: u64,
    pub sessions_closed: u64,
    pub operators_joined: u64,
    pub messages_relayed: u64,
    pub messages_rejected: u64,
    pub messages_marked_read: u64,
    pub typing_signals: u64,
    pub active_connections: u64,
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
