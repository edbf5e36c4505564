//! Job endpoint
//!
//! `POST /run` takes `{ "input": { ... } }` and answers with the job output
//! object. Failures keep the same body shape (`status: "error"` plus the
//! message) with a status code matching the failure kind.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::pipeline::{JobEnvelope, JobOutput};
use crate::AppState;

/// POST /run
pub async fn run_job(
    State(state): State<AppState>,
    payload: Result<Json<JobEnvelope>, JsonRejection>,
) -> ApiResult<Json<JobOutput>> {
    let Json(envelope) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    match state.orchestrator.handle(envelope.input).await {
        Ok(output) => Ok(Json(output)),
        Err(e) => {
            warn!("Job failed: {}", e);
            Err(e.into())
        }
    }
}

/// Build job routes
pub fn job_routes() -> Router<AppState> {
    Router::new().route("/run", post(run_job))
}
