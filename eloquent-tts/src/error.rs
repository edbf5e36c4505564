//! Error types for eloquent-tts
//!
//! Job failures follow one propagation policy: recoverable failures (voice
//! resolution tiers, cache storage) are swallowed with logging inside their
//! components and never reach this module. Everything here terminates the job
//! and is reported to the caller as `status: "error"` plus the message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::time::Duration;
use thiserror::Error;

use crate::pipeline::request::JobOutput;

/// Synthesis engine failure
#[derive(Debug, Error)]
pub enum EngineError {
    /// Request could not be delivered or the response could not be read
    #[error("Engine request failed: {0}")]
    Transport(String),

    /// Engine answered with a non-success status
    #[error("Engine returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Engine output was not a readable waveform
    #[error("Engine audio decode failed: {0}")]
    Decode(String),

    /// Engine-side failure reported in-process
    #[error("Engine failure: {0}")]
    Failed(String),
}

/// Job-terminating failures
#[derive(Debug, Error)]
pub enum JobError {
    /// Missing or invalid input, rejected before any resolution or dispatch
    #[error("Validation error: {0}")]
    Validation(String),

    /// Engine failed on one clause; fatal to the job
    #[error("Synthesis failed on clause {clause}: {source}")]
    Synthesis {
        clause: usize,
        #[source]
        source: EngineError,
    },

    /// Engine never reported ready within the admission deadline
    #[error("Engine not ready after {0:?}")]
    InitializationTimeout(Duration),

    /// Clause waveforms could not be joined
    #[error("Stitching failed: {0}")]
    Stitch(String),

    /// Output container could not be written
    #[error("Audio encoding failed: {0}")]
    Encode(String),

    /// Task name not recognised
    #[error("Unknown task: {0}")]
    UnknownTask(String),
}

impl JobError {
    /// HTTP status used when the job is served over HTTP
    pub fn status_code(&self) -> StatusCode {
        match self {
            JobError::Validation(_) | JobError::UnknownTask(_) => StatusCode::BAD_REQUEST,
            JobError::InitializationTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            JobError::Synthesis { .. } | JobError::Stitch(_) | JobError::Encode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Result type for job operations
pub type JobResult<T> = Result<T, JobError>;

/// Transport-level API error (malformed envelopes, unreadable bodies)
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Job failed (status from the job error)
    #[error(transparent)]
    Job(#[from] JobError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Job(err) => err.status_code(),
        };

        (status, Json(JobOutput::error(self.to_string()))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
