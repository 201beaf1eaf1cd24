//! API route definitions

use axum::{
    extract::State,
    response::Html,
    routing::{get, post},
    Json, Router,
};

use super::shared::SharedStateHandle;
use super::types::*;

/// Embedded dashboard HTML
const DASHBOARD_HTML: &str = include_str!("dashboard.html");

/// Create the API router with all endpoints
pub fn create_router(state: SharedStateHandle) -> Router {
    Router::new()
        // Dashboard at root
        .route("/", get(|| async { Html(DASHBOARD_HTML) }))
        // Status endpoint
        .route("/api/status", get(status_handler))
        // Position read endpoint (polling)
        .route("/api/position", get(position_handler))
        // Trigger arm endpoint
        .route("/api/trigger/arm", post(arm_handler))
        // WebSocket endpoint for the relay session
        .route("/ws", get(super::websocket::ws_handler))
        // Add state to all routes
        .with_state(state)
}

async fn status_handler(State(state): State<SharedStateHandle>) -> Json<StatusResponse> {
    // One snapshot call so session and count come from the same lock hold
    let snapshot = state.snapshot();
    Json(StatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        session: snapshot.session.as_str(),
        pending_triggers: snapshot.pending_triggers,
    })
}

async fn position_handler(State(state): State<SharedStateHandle>) -> Json<PositionResponse> {
    let position = state.position();
    Json(PositionResponse {
        x: position.x,
        y: position.y,
        z: position.z,
    })
}

async fn arm_handler(State(state): State<SharedStateHandle>) -> Json<ArmResponse> {
    let count = state.arm_trigger();
    tracing::info!(count, "Trigger armed");
    Json(ArmResponse {
        status: "armed",
        count,
    })
}
