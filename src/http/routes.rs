//! HTTP route definitions

use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::app::AppState;
use crate::game::ClockState;
use crate::util::time::unix_millis;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    server_time: u64,
    tick: u64,
    clock: ClockState,
    connections: usize,
    alive_players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.simulation.stats();
    let status = match stats.clock {
        ClockState::Running => "ok",
        ClockState::NotStarted | ClockState::Stopped => "stopped",
    };

    Json(HealthResponse {
        status,
        uptime_secs: state.uptime.secs(),
        server_time: unix_millis(),
        tick: stats.tick,
        clock: stats.clock,
        connections: stats.connections,
        alive_players: stats.alive_players,
    })
}
