//! Voice references and their resolution
//!
//! A job resolves its voice exactly once; the resulting [`VoiceReference`]
//! is shared read-only by every clause of that job.

pub mod catalog;
pub mod resolver;

pub use catalog::{list_voices, VoiceInfo};
pub use resolver::{ResolverConfig, VoiceResolver};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use once_cell::sync::OnceCell;
use std::fmt;

/// Audio file extensions recognised for references and presets, in lookup order
pub const AUDIO_EXTENSIONS: [&str; 5] = ["wav", "mp3", "flac", "ogg", "m4a"];

/// Transcript extensions, in lookup order
pub const TRANSCRIPT_EXTENSIONS: [&str; 2] = ["lab", "txt"];

/// Voice ids that always mean "engine default voice"
pub const RESERVED_VOICE_IDS: [&str; 2] = ["default", "none"];

/// Which lookup tier produced a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTier {
    /// Audio/transcript supplied in the request
    Explicit,
    /// Downloaded (or cached) from object storage
    RemoteStore,
    /// Local preset directory
    LocalPreset,
    /// No reference; engine default voice
    None,
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolutionTier::Explicit => "explicit",
            ResolutionTier::RemoteStore => "remote_store",
            ResolutionTier::LocalPreset => "local_preset",
            ResolutionTier::None => "none",
        };
        f.write_str(name)
    }
}

/// Reference audio plus its transcript
#[derive(Clone)]
pub struct VoiceReference {
    pub audio: Vec<u8>,
    /// May be empty
    pub transcript: String,
    pub tier: ResolutionTier,
    encoded: OnceCell<String>,
}

impl VoiceReference {
    pub fn new(audio: Vec<u8>, transcript: impl Into<String>, tier: ResolutionTier) -> Self {
        Self {
            audio,
            transcript: transcript.into(),
            tier,
            encoded: OnceCell::new(),
        }
    }

    /// Base64 of `audio`, encoded on first use and reused by every clause
    /// sharing this reference
    pub fn audio_base64(&self) -> &str {
        self.encoded.get_or_init(|| BASE64.encode(&self.audio))
    }
}

impl PartialEq for VoiceReference {
    fn eq(&self, other: &Self) -> bool {
        self.audio == other.audio && self.transcript == other.transcript && self.tier == other.tier
    }
}

impl fmt::Debug for VoiceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceReference")
            .field("audio_bytes", &self.audio.len())
            .field("transcript", &self.transcript)
            .field("tier", &self.tier)
            .finish()
    }
}

/// Literal reference pair carried by a request
#[derive(Clone, PartialEq)]
pub struct ReferenceAudio {
    pub audio: Vec<u8>,
    pub text: String,
}

impl fmt::Debug for ReferenceAudio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceAudio")
            .field("audio_bytes", &self.audio.len())
            .field("text", &self.text)
            .finish()
    }
}

/// Keep only alphanumerics, space, `_` and `-`, then trim
///
/// The result is the only form of a voice id ever used in a path or key.
pub fn sanitize_voice_id(voice_id: &str) -> String {
    voice_id
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Whether a voice id names the engine default voice
pub fn is_reserved_voice_id(voice_id: &str) -> bool {
    let id = voice_id.trim();
    RESERVED_VOICE_IDS
        .iter()
        .any(|reserved| id.eq_ignore_ascii_case(reserved))
}

/// Whether a file name carries a recognised audio extension
pub fn has_audio_extension(name: &str) -> bool {
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.iter().any(|a| e.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}
