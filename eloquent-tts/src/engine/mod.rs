//! Speech synthesis engine seam
//!
//! The engine is an opaque `synthesize(text, reference, params) -> waveform`
//! collaborator. [`http::HttpEngine`] talks to a sidecar inference server;
//! tests plug in their own implementations.

pub mod http;

pub use http::HttpEngine;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::audio::AudioSegment;
use crate::error::EngineError;
use crate::voice::VoiceReference;

/// Text used for the startup warm-up synthesis
pub const WARM_UP_TEXT: &str = "Hello world, this is a test voice.";
/// Token budget for the warm-up synthesis
pub const WARM_UP_MAX_NEW_TOKENS: u32 = 48;

/// Sampling parameters forwarded to the engine unchanged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub top_p: f64,
    pub temperature: f64,
    pub repetition_penalty: f64,
    pub max_new_tokens: u32,
    pub chunk_length: u32,
    pub seed: Option<u64>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            top_p: 0.7,
            temperature: 0.7,
            repetition_penalty: 1.2,
            max_new_tokens: 1024,
            chunk_length: 200,
            seed: None,
        }
    }
}

/// One engine call (one clause)
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub text: String,
    pub reference: Option<Arc<VoiceReference>>,
    /// Speaking-rate multiplier (1.0 = natural)
    pub speed: f64,
    pub params: GenerationParams,
}

/// Synthesis engine
#[async_trait]
pub trait SynthesisEngine: Send + Sync {
    /// Engine name for logs
    fn name(&self) -> &str;

    /// Whether the engine can accept work
    async fn health(&self) -> bool;

    /// Synthesize one clause
    async fn synthesize(&self, request: &EngineRequest) -> Result<AudioSegment, EngineError>;
}

/// Engine readiness signal
///
/// Starts not-ready; flipped once by the warm-up task. Jobs wait on it with a
/// deadline before admission.
#[derive(Debug, Clone)]
pub struct EngineReadiness {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for EngineReadiness {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineReadiness {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Readiness that is already satisfied
    pub fn ready() -> Self {
        let readiness = Self::new();
        readiness.mark_ready();
        readiness
    }

    pub fn mark_ready(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait up to `timeout` for readiness; `false` on deadline
    pub async fn wait(&self, timeout: Duration) -> bool {
        if self.is_ready() {
            return true;
        }
        let mut rx = self.tx.subscribe();
        let ready = matches!(
            tokio::time::timeout(timeout, rx.wait_for(|ready| *ready)).await,
            Ok(Ok(_))
        );
        ready
    }
}

/// Startup warm-up
///
/// Polls the engine health probe until it passes, runs one short synthesis so
/// the first real job does not pay compilation/cache-load cost, then marks
/// the engine ready. A failed warm-up synthesis is logged only.
pub async fn warm_up(
    engine: Arc<dyn SynthesisEngine>,
    readiness: EngineReadiness,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    info!("Waiting for engine {} to become healthy", engine.name());
    loop {
        if engine.health().await {
            break;
        }
        debug!("Engine {} not healthy yet", engine.name());
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Engine warm-up cancelled");
                return;
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }

    let request = EngineRequest {
        text: WARM_UP_TEXT.to_string(),
        reference: None,
        speed: 1.0,
        params: GenerationParams {
            max_new_tokens: WARM_UP_MAX_NEW_TOKENS,
            ..GenerationParams::default()
        },
    };

    let started = std::time::Instant::now();
    match engine.synthesize(&request).await {
        Ok(segment) => info!(
            "Engine warm-up complete in {} ms ({:.2}s audio)",
            started.elapsed().as_millis(),
            segment.duration_secs()
        ),
        Err(e) => warn!("Engine warm-up synthesis failed: {}", e),
    }

    readiness.mark_ready();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_readiness_times_out() {
        let readiness = EngineReadiness::new();
        assert!(!readiness.wait(Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn test_readiness_wakes_waiter() {
        let readiness = EngineReadiness::new();
        let waiter = readiness.clone();
        let handle = tokio::spawn(async move { waiter.wait(Duration::from_secs(5)).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        readiness.mark_ready();

        assert!(handle.await.unwrap());
        assert!(readiness.is_ready());
        assert!(EngineReadiness::ready().wait(Duration::ZERO).await);
    }

    #[test]
    fn test_default_params() {
        let params = GenerationParams::default();
        assert_eq!(params.chunk_length, 200);
        assert_eq!(params.max_new_tokens, 1024);
        assert_eq!(params.top_p, 0.7);
        assert_eq!(params.repetition_penalty, 1.2);
        assert_eq!(params.temperature, 0.7);
        assert!(params.seed.is_none());
    }
}
