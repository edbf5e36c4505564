//! Health and build info endpoints

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    /// Engine warm-up finished
    pub engine_ready: bool,
    /// A synthesis job is running
    pub busy: bool,
    pub uptime_secs: i64,
}

/// Build information response
#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub version: String,
    pub git_hash: String,
    pub build_timestamp: String,
    pub build_profile: String,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let orchestrator = &state.orchestrator;
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "eloquent-tts".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine_ready: orchestrator.readiness().is_ready(),
        busy: orchestrator.busy().is_set(),
        uptime_secs: (chrono::Utc::now() - state.started_at).num_seconds(),
    })
}

/// GET /buildinfo
pub async fn get_build_info() -> Json<BuildInfo> {
    Json(BuildInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/buildinfo", get(get_build_info))
}
