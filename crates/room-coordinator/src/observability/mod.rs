//! Observability surface: health endpoints and Prometheus metrics.

pub mod health;
pub mod metrics;

pub use health::{observability_router, HealthState, ObservabilityState};
