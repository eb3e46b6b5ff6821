//! Parley Room Coordinator
//!
//! Stateful WebSocket server for real-time room coordination: presence,
//! chat with bounded history replay, and opaque WebRTC signaling relay.
//!
//! # Servers
//!
//! - Client WebSocket endpoint (default: 0.0.0.0:4480, `/ws`)
//! - Health/status/metrics endpoints (default: 0.0.0.0:8081)
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize Prometheus metrics recorder
//! 3. Build the participation store (lazy Postgres pool) and identity client
//! 4. Initialize the registry and actor system
//! 5. Start the observability HTTP server
//! 6. Start the client WebSocket server
//! 7. Wait for shutdown signal, then drain

#![warn(clippy::pedantic)]
#![allow(clippy::too_many_lines)] // main.rs orchestrates startup, naturally longer

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use common::identity::IdentityLookup;
use common::secret::ExposeSecret;
use common::store::ParticipationStore;
use room_coordinator::actors::{CoordinatorHandle, CoordinatorMetrics};
use room_coordinator::config::Config;
use room_coordinator::observability::metrics::init_metrics_recorder;
use room_coordinator::observability::{observability_router, HealthState, ObservabilityState};
use room_coordinator::registry::ConnectionRegistry;
use room_coordinator::relay::SignalRelay;
use room_coordinator::services::{HttpIdentityService, PgParticipationStore};
use room_coordinator::transport::{self, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "room_coordinator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Parley room coordinator");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        node_id = %config.node_id,
        bind_address = %config.bind_address,
        health_bind_address = %config.health_bind_address,
        identity_service_url = %config.identity_service_url,
        history_capacity = config.history_capacity,
        client_buffer = config.client_buffer,
        "Configuration loaded successfully"
    );

    // Initialize Prometheus metrics recorder before anything records
    info!("Initializing Prometheus metrics recorder...");
    let prometheus_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;
    info!("Prometheus metrics recorder initialized");

    // Durable store: lazy pool so a down database degrades durability
    // without preventing startup.
    let store: Arc<dyn ParticipationStore> = Arc::new(
        PgParticipationStore::connect_lazy(config.database_url.expose_secret()).map_err(|e| {
            error!(error = %e, "Failed to configure participation store");
            e
        })?,
    );
    info!("Participation store configured");

    // Identity lookup client
    let identity: Arc<dyn IdentityLookup> =
        Arc::new(HttpIdentityService::new(&config.identity_service_url));

    // Registry + actor system
    info!("Initializing actor system...");
    let metrics = CoordinatorMetrics::new();
    let registry = ConnectionRegistry::new(Arc::clone(&metrics));
    let coordinator = CoordinatorHandle::new(
        Arc::clone(&registry),
        Arc::clone(&store),
        Arc::clone(&metrics),
        config.history_capacity,
    );
    let relay = SignalRelay::new(Arc::clone(&registry), Arc::clone(&metrics));
    info!("Actor system initialized");

    // Shutdown token as child of the coordinator's token: all server
    // tasks stop when the coordinator shuts down.
    let shutdown_token = coordinator.child_token();

    // Observability server (liveness, readiness, status, metrics)
    let health_addr: SocketAddr = config.health_bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.health_bind_address, "Invalid health bind address");
        format!("Invalid health bind address: {e}")
    })?;

    let observability_state = Arc::new(ObservabilityState {
        health: HealthState::new(),
        metrics: Arc::clone(&metrics),
    });

    let metrics_router = Router::new().route(
        "/metrics",
        axum::routing::get(move || {
            let handle = prometheus_handle.clone();
            async move { handle.render() }
        }),
    );
    let observability_app =
        observability_router(Arc::clone(&observability_state)).merge(metrics_router);

    // Bind before spawning to fail fast on bind errors
    let health_listener = tokio::net::TcpListener::bind(health_addr)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %health_addr, "Failed to bind observability server");
            format!("Failed to bind observability server to {health_addr}: {e}")
        })?;

    let health_shutdown = shutdown_token.child_token();
    tokio::spawn(async move {
        info!(addr = %health_addr, "Observability server starting");
        let server = axum::serve(health_listener, observability_app).with_graceful_shutdown(
            async move {
                health_shutdown.cancelled().await;
                info!("Observability server shutting down");
            },
        );
        if let Err(e) = server.await {
            error!(error = %e, "Observability server failed");
        }
    });
    info!(addr = %health_addr, "Observability server started");

    // Client WebSocket server
    let client_addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.bind_address, "Invalid bind address");
        format!("Invalid bind address: {e}")
    })?;

    let app_state = Arc::new(AppState {
        registry: Arc::clone(&registry),
        coordinator: coordinator.clone(),
        relay,
        identity,
        client_buffer: config.client_buffer,
    });
    let client_app = transport::router(app_state);

    let client_listener = tokio::net::TcpListener::bind(client_addr)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %client_addr, "Failed to bind client server");
            format!("Failed to bind client server to {client_addr}: {e}")
        })?;

    let client_shutdown = shutdown_token.child_token();
    tokio::spawn(async move {
        info!(addr = %client_addr, "Client server starting");
        let server =
            axum::serve(client_listener, client_app).with_graceful_shutdown(async move {
                client_shutdown.cancelled().await;
                info!("Client server shutting down");
            });
        if let Err(e) = server.await {
            error!(error = %e, "Client server failed");
        }
    });
    info!(addr = %client_addr, "Client server started");

    observability_state.health.set_ready();

    // Wait for shutdown signal
    info!("Room coordinator running - press Ctrl+C to shutdown");
    shutdown_signal().await;

    info!("Shutdown signal received, initiating graceful shutdown...");

    // Stop advertising readiness immediately so traffic drains
    observability_state.health.set_not_ready();

    // Drain the actor system; this cancels the root token, which also
    // stops both servers via their child tokens.
    if let Err(e) = coordinator.shutdown().await {
        warn!(error = %e, "Actor system shutdown error");
    }

    // Give server tasks time to finish closing sockets
    tokio::time::sleep(Duration::from_secs(1)).await;

    info!("Room coordinator shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed. This is acceptable
/// because without signal handlers the service cannot shut down
/// gracefully.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
