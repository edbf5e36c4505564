//! WAV/PCM container encoding and engine output decoding

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use super::{AudioSegment, Samples, StitchedAudio};
use crate::error::{EngineError, JobError, JobResult};

/// Output container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// 16-bit PCM RIFF/WAV
    #[default]
    Wav,
    /// Raw 16-bit little-endian samples, no header
    Pcm,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Wav => "wav",
            OutputFormat::Pcm => "pcm",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wav" => Ok(OutputFormat::Wav),
            "pcm" => Ok(OutputFormat::Pcm),
            other => Err(JobError::Validation(format!(
                "Unsupported output format: {:?} (expected wav or pcm)",
                other
            ))),
        }
    }
}

/// Encode stitched audio as a 16-bit mono container
pub fn encode(audio: &StitchedAudio, format: OutputFormat) -> JobResult<Vec<u8>> {
    let samples = audio.samples.to_i16();

    match format {
        OutputFormat::Pcm => Ok(samples.iter().flat_map(|s| s.to_le_bytes()).collect()),
        OutputFormat::Wav => {
            let spec = hound::WavSpec {
                channels: 1,
                sample_rate: audio.sample_rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };

            let mut buffer = Vec::with_capacity(44 + samples.len() * 2);
            {
                let mut writer = hound::WavWriter::new(Cursor::new(&mut buffer), spec)
                    .map_err(|e| JobError::Encode(e.to_string()))?;
                for sample in samples {
                    writer
                        .write_sample(sample)
                        .map_err(|e| JobError::Encode(e.to_string()))?;
                }
                writer
                    .finalize()
                    .map_err(|e| JobError::Encode(e.to_string()))?;
            }
            Ok(buffer)
        }
    }
}

/// Decode a WAV payload returned by the engine
///
/// 16-bit integer and 32-bit float streams keep their representation; other
/// integer widths are normalised to float. Multi-channel audio is averaged
/// down to mono.
pub fn decode_wav(bytes: &[u8]) -> Result<AudioSegment, EngineError> {
    let reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| EngineError::Decode(e.to_string()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => {
            let raw = reader
                .into_samples::<i16>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| EngineError::Decode(e.to_string()))?;
            Samples::Int16(downmix_i16(raw, channels))
        }
        (hound::SampleFormat::Int, bits) => {
            let scale = (1i64 << (bits.saturating_sub(1) as u32)) as f32;
            let raw = reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| EngineError::Decode(e.to_string()))?;
            Samples::Float32(downmix_f32(raw, channels))
        }
        (hound::SampleFormat::Float, _) => {
            let raw = reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| EngineError::Decode(e.to_string()))?;
            Samples::Float32(downmix_f32(raw, channels))
        }
    };

    Ok(AudioSegment::new(samples, spec.sample_rate))
}

fn downmix_f32(raw: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels == 1 {
        return raw;
    }
    raw.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

fn downmix_i16(raw: Vec<i16>, channels: usize) -> Vec<i16> {
    if channels == 1 {
        return raw;
    }
    raw.chunks(channels)
        .map(|frame| (frame.iter().map(|&v| v as i32).sum::<i32>() / frame.len() as i32) as i16)
        .collect()
}
