//! Job input/output schema and boundary validation
//!
//! Wire fields are camelCase; the snake_case names used by older clients
//! (`reference_id`, `top_p`, `max_new_tokens`, ...) are accepted as aliases.
//! Validation happens once, in [`JobInput::into_request`], before any voice
//! resolution or engine work.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::audio::OutputFormat;
use crate::engine::GenerationParams;
use crate::error::{JobError, JobResult};
use crate::voice::{ReferenceAudio, VoiceInfo};

/// Largest accepted request `speed`
pub const MAX_SPEED: f64 = 4.0;
/// Largest accepted request `pauseAmount`
pub const MAX_PAUSE_AMOUNT: f64 = 10.0;

/// `{ "input": { ... } }` job envelope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobEnvelope {
    #[serde(default)]
    pub input: JobInput,
}

/// Literal reference pair as sent on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceInput {
    /// Base64 audio
    pub audio: String,
    #[serde(default)]
    pub text: String,
}

/// Raw job input, every field optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobInput {
    pub task: Option<String>,
    pub text: Option<String>,
    #[serde(alias = "voice_id", alias = "reference_id", alias = "referenceId")]
    pub voice_id: Option<String>,
    pub references: Vec<ReferenceInput>,
    #[serde(alias = "chunk_length")]
    pub chunk_length: Option<u32>,
    #[serde(alias = "max_new_tokens")]
    pub max_new_tokens: Option<u32>,
    #[serde(alias = "top_p")]
    pub top_p: Option<f64>,
    #[serde(alias = "repetition_penalty")]
    pub repetition_penalty: Option<f64>,
    pub temperature: Option<f64>,
    pub seed: Option<u64>,
    pub speed: Option<f64>,
    #[serde(alias = "pause_amount")]
    pub pause_amount: Option<f64>,
    pub format: Option<String>,
}

/// Job kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Tts,
    ListVoices,
    SyncCache,
}

impl Task {
    pub fn parse(task: Option<&str>) -> JobResult<Self> {
        match task.map(str::trim) {
            None | Some("") | Some("tts") => Ok(Task::Tts),
            Some("list_voices") => Ok(Task::ListVoices),
            Some("sync_cache") => Ok(Task::SyncCache),
            Some(other) => Err(JobError::UnknownTask(other.to_string())),
        }
    }
}

/// Validated synthesis request
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_id: Option<String>,
    pub references: Vec<ReferenceAudio>,
    pub params: GenerationParams,
    /// Multiplies every clause speed
    pub speed: f64,
    /// Scales every inserted silence
    pub pause_amount: f64,
    pub format: OutputFormat,
}

impl JobInput {
    pub fn task(&self) -> JobResult<Task> {
        Task::parse(self.task.as_deref())
    }

    /// Validate and convert; `min_chars` counts characters of the trimmed text
    pub fn into_request(self, min_chars: usize) -> JobResult<SynthesisRequest> {
        let text = self
            .text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| JobError::Validation("Missing text".to_string()))?;

        let chars = text.chars().count();
        if chars < min_chars {
            return Err(JobError::Validation(format!(
                "Text too short: {} characters (minimum {})",
                chars, min_chars
            )));
        }

        let format = match self.format.as_deref() {
            Some(f) => f.parse()?,
            None => OutputFormat::default(),
        };

        let speed = self.speed.unwrap_or(1.0);
        if !(speed.is_finite() && speed > 0.0 && speed <= MAX_SPEED) {
            return Err(JobError::Validation(format!(
                "Invalid speed: {} (must be in (0, {}])",
                speed, MAX_SPEED
            )));
        }
        let pause_amount = self.pause_amount.unwrap_or(1.0);
        if !(pause_amount.is_finite() && (0.0..=MAX_PAUSE_AMOUNT).contains(&pause_amount)) {
            return Err(JobError::Validation(format!(
                "Invalid pauseAmount: {} (must be in [0, {}])",
                pause_amount, MAX_PAUSE_AMOUNT
            )));
        }

        let references = self
            .references
            .into_iter()
            .enumerate()
            .map(|(i, r)| {
                BASE64
                    .decode(r.audio.trim())
                    .map(|audio| ReferenceAudio {
                        audio,
                        text: r.text,
                    })
                    .map_err(|e| {
                        JobError::Validation(format!("Reference {} audio is not base64: {}", i, e))
                    })
            })
            .collect::<JobResult<Vec<_>>>()?;

        let defaults = GenerationParams::default();
        let params = GenerationParams {
            top_p: self.top_p.unwrap_or(defaults.top_p),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            repetition_penalty: self
                .repetition_penalty
                .unwrap_or(defaults.repetition_penalty),
            max_new_tokens: self.max_new_tokens.unwrap_or(defaults.max_new_tokens),
            chunk_length: self.chunk_length.unwrap_or(defaults.chunk_length),
            seed: self.seed,
        };

        Ok(SynthesisRequest {
            text,
            voice_id: self.voice_id.filter(|v| !v.trim().is_empty()),
            references,
            params,
            speed,
            pause_amount,
            format,
        })
    }
}

/// Job outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Error,
}

/// Job output object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutput {
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voices: Option<Vec<VoiceInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobOutput {
    fn empty(status: JobStatus) -> Self {
        Self {
            status,
            audio_base64: None,
            format: None,
            duration_seconds: None,
            voices: None,
            message: None,
            error: None,
        }
    }

    pub fn audio(audio: &[u8], format: OutputFormat, duration_seconds: f64) -> Self {
        Self {
            audio_base64: Some(BASE64.encode(audio)),
            format: Some(format.to_string()),
            duration_seconds: Some(duration_seconds),
            ..Self::empty(JobStatus::Success)
        }
    }

    pub fn voices(voices: Vec<VoiceInfo>) -> Self {
        Self {
            voices: Some(voices),
            ..Self::empty(JobStatus::Success)
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::empty(JobStatus::Success)
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::empty(JobStatus::Error)
        }
    }

    /// Decoded audio payload, if any
    pub fn decode_audio(&self) -> Option<Vec<u8>> {
        self.audio_base64
            .as_deref()
            .and_then(|a| BASE64.decode(a).ok())
    }
}
