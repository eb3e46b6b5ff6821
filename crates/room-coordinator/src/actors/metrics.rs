//! Shared coordinator gauges.
//!
//! Atomic counters shared between the actor system and registry (which
//! update them) and the observability surface (which reads snapshots for
//! `/status` and readiness decisions). Prometheus series are recorded
//! separately in [`crate::observability::metrics`]; these exist so status
//! queries never have to round-trip through an actor mailbox.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Live counters for the coordinator instance.
#[derive(Debug, Default)]
pub struct CoordinatorMetrics {
    /// Currently registered connections.
    current_connections: AtomicU32,
    /// Currently active rooms.
    current_rooms: AtomicU32,
    /// Signaling envelopes relayed since start.
    signals_relayed: AtomicU64,
    /// Signaling envelopes dropped (unresolved target or gone channel).
    signals_dropped: AtomicU64,
    /// Outbound events dropped on full client buffers.
    events_dropped: AtomicU64,
    /// Durable store writes that failed.
    store_write_failures: AtomicU64,
}

/// Point-in-time snapshot of [`CoordinatorMetrics`].
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorMetricsSnapshot {
    pub connections: u32,
    pub rooms: u32,
    pub signals_relayed: u64,
    pub signals_dropped: u64,
    pub events_dropped: u64,
    pub store_write_failures: u64,
}

impl CoordinatorMetrics {
    /// Create a new shared metrics instance.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn connection_opened(&self) {
        self.current_connections.fetch_add(1, Ordering::SeqCst);
    }

    pub fn connection_closed(&self) {
        let previous = self.current_connections.fetch_sub(1, Ordering::SeqCst);
        if previous == 0 {
            // Underflow means unbalanced accounting; clamp back to zero.
            self.current_connections.store(0, Ordering::SeqCst);
        }
    }

    pub fn room_opened(&self) {
        self.current_rooms.fetch_add(1, Ordering::SeqCst);
    }

    pub fn room_closed(&self) {
        let previous = self.current_rooms.fetch_sub(1, Ordering::SeqCst);
        if previous == 0 {
            self.current_rooms.store(0, Ordering::SeqCst);
        }
    }

    pub fn signal_relayed(&self) {
        self.signals_relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn signal_dropped(&self) {
        self.signals_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn event_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn store_write_failed(&self) {
        self.store_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Read a consistent-enough snapshot for status reporting.
    #[must_use]
    pub fn snapshot(&self) -> CoordinatorMetricsSnapshot {
        CoordinatorMetricsSnapshot {
            connections: self.current_connections.load(Ordering::SeqCst),
            rooms: self.current_rooms.load(Ordering::SeqCst),
            signals_relayed: self.signals_relayed.load(Ordering::Relaxed),
            signals_dropped: self.signals_dropped.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            store_write_failures: self.store_write_failures.load(Ordering::Relaxed),
        }
    }
}
