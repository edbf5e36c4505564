//! eloquent-tts library - long-form TTS orchestration service
//!
//! Turns long text into one waveform: preprocess and segment the text,
//! resolve the voice once, synthesize clause by clause with per-clause
//! prosody, stitch with pauses, encode. A background task backs up the
//! engine's compiled-model cache whenever no job is running.

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod audio;
pub mod cache_sync;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod prosody;
pub mod text;
pub mod voice;

pub use error::{ApiError, EngineError, JobError};
pub use pipeline::Orchestrator;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            started_at: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::job_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
