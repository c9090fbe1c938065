//! HTTP surface tests

mod support;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use world_server::app::AppState;
use world_server::config::Config;
use world_server::game::Simulation;
use world_server::http::build_router;

async fn get_health(state: AppState) -> serde_json::Value {
    let response = build_router(state)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_reports_stopped_before_start() {
    let (_sim, handle) = Simulation::new(support::scenario_params());
    let state = AppState::new(Config::new(8080), handle);

    let json = get_health(state).await;
    assert_eq!(json["status"], "stopped");
    assert_eq!(json["clock"], "not_started");
    assert_eq!(json["tick"], 0);
    assert_eq!(json["connections"], 0);
}

#[tokio::test]
async fn health_reports_running_clock() {
    let (sim, handle) = Simulation::new(support::scenario_params());
    let running = sim.start();
    let state = AppState::new(Config::new(8080), handle);

    let json = get_health(state).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["clock"], "running");

    running.stop().await;
}

#[test]
fn connection_ids_follow_accept_order() {
    let (_sim, handle) = Simulation::new(support::scenario_params());
    let state = AppState::new(Config::new(8080), handle);

    let first = state.next_connection_id();
    let second = state.clone().next_connection_id();
    assert!(first < second);
}
