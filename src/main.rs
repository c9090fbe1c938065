//! World Server - authoritative multiplayer world simulation
//!
//! This is the main entry point for the server. It handles:
//! - Configuration loading and validation
//! - Starting and stopping the simulation clock
//! - WebSocket connections for real-time play
//! - HTTP health endpoint

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use world_server::app::AppState;
use world_server::config::Config;
use world_server::game::{Simulation, WorldParams};
use world_server::http::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration; an invalid config never starts the server
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    info!("Starting World Server");
    info!(
        map_size = config.map_size,
        update_radius = config.update_radius,
        tick_interval_ms = config.tick_interval_ms,
        "World configuration"
    );

    // Start the simulation clock
    let (simulation, handle) = Simulation::new(WorldParams::from_config(&config, rand::random()));
    let running = simulation.start();

    // Create application state
    let state = AppState::new(config.clone(), handle);

    // Build router
    let router = build_router(state);

    // Start server
    let addr = config.server_addr();
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let stats = running.stop().await;
    info!(tick = stats.tick, "Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
