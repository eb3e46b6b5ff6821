//! Health and status endpoints.
//!
//! Kubernetes-compatible probes plus a small JSON status view:
//! - `GET /health` - liveness (is the process running?)
//! - `GET /ready` - readiness (accepting traffic? flips off while draining)
//! - `GET /status` - live room/connection/relay counters
//!
//! The `/metrics` endpoint is served separately via
//! `metrics-exporter-prometheus`.

use crate::actors::metrics::CoordinatorMetrics;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Health state for the coordinator.
#[derive(Debug)]
pub struct HealthState {
    /// True once startup completed.
    live: AtomicBool,
    /// True while the coordinator accepts traffic.
    ready: AtomicBool,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    /// Create a new health state (live=true, ready=false).
    #[must_use]
    pub fn new() -> Self {
        Self {
            live: AtomicBool::new(true),
            ready: AtomicBool::new(false),
        }
    }

    pub fn set_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn set_not_ready(&self) {
        self.ready.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Shared state for the observability router.
pub struct ObservabilityState {
    pub health: HealthState,
    pub metrics: Arc<CoordinatorMetrics>,
}

/// JSON body served by `/status`.
#[derive(Debug, Serialize)]
struct StatusBody {
    rooms: u32,
    connections: u32,
    signals_relayed: u64,
    signals_dropped: u64,
    events_dropped: u64,
    store_write_failures: u64,
}

/// Build the router with health, readiness, and status endpoints.
pub fn observability_router(state: Arc<ObservabilityState>) -> Router {
    Router::new()
        .route("/health", get(liveness_handler))
        .route("/ready", get(readiness_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

/// Liveness probe: 200 while the process runs.
async fn liveness_handler(State(state): State<Arc<ObservabilityState>>) -> StatusCode {
    if state.health.is_live() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Readiness probe: 200 while accepting traffic, 503 while draining.
async fn readiness_handler(State(state): State<Arc<ObservabilityState>>) -> StatusCode {
    if state.health.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Live counter snapshot.
async fn status_handler(State(state): State<Arc<ObservabilityState>>) -> Json<StatusBody> {
    let snapshot = state.metrics.snapshot();
    Json(StatusBody {
        rooms: snapshot.rooms,
        connections: snapshot.connections,
        signals_relayed: snapshot.signals_relayed,
        signals_dropped: snapshot.signals_dropped,
        events_dropped: snapshot.events_dropped,
        store_write_failures: snapshot.store_write_failures,
    })
}
