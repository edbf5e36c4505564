//! HTTP client for a sidecar inference server
//!
//! `POST {base}/v1/tts` with a JSON body returns a WAV payload;
//! `GET {base}/v1/health` answers 200 once the model is loaded.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use super::{EngineRequest, SynthesisEngine};
use crate::audio::{decode_wav, AudioSegment};
use crate::error::EngineError;

const USER_AGENT: &str = concat!("eloquent-tts/", env!("CARGO_PKG_VERSION"));
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct TtsReference<'a> {
    /// Base64 audio
    audio: &'a str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct TtsBody<'a> {
    text: &'a str,
    references: Vec<TtsReference<'a>>,
    chunk_length: u32,
    max_new_tokens: u32,
    top_p: f64,
    repetition_penalty: f64,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    speed: f64,
    format: &'static str,
    streaming: bool,
}

/// Engine reached over HTTP
pub struct HttpEngine {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpEngine {
    /// `request_timeout` bounds one clause synthesis
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, EngineError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn body<'a>(request: &'a EngineRequest) -> TtsBody<'a> {
        let references = request
            .reference
            .as_deref()
            .map(|r| TtsReference {
                audio: r.audio_base64(),
                text: &r.transcript,
            })
            .into_iter()
            .collect();

        TtsBody {
            text: &request.text,
            references,
            chunk_length: request.params.chunk_length,
            max_new_tokens: request.params.max_new_tokens,
            top_p: request.params.top_p,
            repetition_penalty: request.params.repetition_penalty,
            temperature: request.params.temperature,
            seed: request.params.seed,
            speed: request.speed,
            format: "wav",
            streaming: false,
        }
    }
}

#[async_trait]
impl SynthesisEngine for HttpEngine {
    fn name(&self) -> &str {
        "http"
    }

    async fn health(&self) -> bool {
        let url = format!("{}/v1/health", self.base_url);
        match self
            .http_client
            .get(&url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Engine health probe failed: {}", e);
                false
            }
        }
    }

    async fn synthesize(&self, request: &EngineRequest) -> Result<AudioSegment, EngineError> {
        let url = format!("{}/v1/tts", self.base_url);
        tracing::debug!(
            chars = request.text.chars().count(),
            speed = request.speed,
            has_reference = request.reference.is_some(),
            "Engine synthesis request"
        );

        let response = self
            .http_client
            .post(&url)
            .json(&Self::body(request))
            .send()
            .await
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EngineError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| EngineError::Transport(e.to_string()))?;
        decode_wav(&bytes)
    }
}
