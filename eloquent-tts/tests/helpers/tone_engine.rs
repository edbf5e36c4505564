//! Fake synthesis engine
//!
//! Produces `samples_per_char` samples of a constant tone per input character
//! at a fixed sample rate, so output lengths are predictable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use eloquent_tts::audio::{AudioSegment, Samples};
use eloquent_tts::engine::{EngineRequest, SynthesisEngine};
use eloquent_tts::voice::ResolutionTier;
use eloquent_tts::EngineError;

/// One recorded engine call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub text: String,
    pub speed: f64,
    pub tier: Option<ResolutionTier>,
    pub transcript: Option<String>,
}

pub struct ToneEngine {
    pub sample_rate: u32,
    pub samples_per_char: usize,
    /// Fail any clause containing this text
    pub fail_on: Option<String>,
    /// Emit float samples instead of 16-bit
    pub float_output: bool,
    healthy: AtomicBool,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ToneEngine {
    pub fn new() -> Self {
        Self {
            sample_rate: 1000,
            samples_per_char: 10,
            fail_on: None,
            float_output: false,
            healthy: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(text: &str) -> Self {
        Self {
            fail_on: Some(text.to_string()),
            ..Self::new()
        }
    }

    /// Engine that answers with 32-bit float samples
    pub fn float() -> Self {
        Self {
            float_output: true,
            ..Self::new()
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SynthesisEngine for ToneEngine {
    fn name(&self) -> &str {
        "tone"
    }

    async fn health(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    async fn synthesize(&self, request: &EngineRequest) -> Result<AudioSegment, EngineError> {
        self.calls.lock().unwrap().push(RecordedCall {
            text: request.text.clone(),
            speed: request.speed,
            tier: request.reference.as_ref().map(|r| r.tier),
            transcript: request.reference.as_ref().map(|r| r.transcript.clone()),
        });

        if let Some(marker) = &self.fail_on {
            if request.text.contains(marker.as_str()) {
                return Err(EngineError::Failed(format!("refused {:?}", request.text)));
            }
        }

        let len = request.text.chars().count() * self.samples_per_char;
        let samples = if self.float_output {
            Samples::Float32(vec![0.25; len])
        } else {
            Samples::Int16(vec![8000; len])
        };
        Ok(AudioSegment::new(samples, self.sample_rate))
    }
}
