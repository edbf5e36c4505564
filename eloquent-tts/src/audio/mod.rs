//! Audio buffers, stitching and container encoding
//!
//! Waveforms stay in the numeric representation the engine produced
//! (16-bit integer or 32-bit float) until the final container is written.

pub mod encode;
pub mod stitcher;

pub use encode::{decode_wav, encode, OutputFormat};
pub use stitcher::{AudioStitcher, StitchedAudio};

/// Sample buffer in engine representation (mono)
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    Int16(Vec<i16>),
    Float32(Vec<f32>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::Int16(s) => s.len(),
            Samples::Float32(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Zero-valued buffer of `count` samples in the same representation
    pub fn silence_like(&self, count: usize) -> Samples {
        match self {
            Samples::Int16(_) => Samples::Int16(vec![0; count]),
            Samples::Float32(_) => Samples::Float32(vec![0.0; count]),
        }
    }

    /// Convert into the representation of `template`
    pub fn convert_like(self, template: &Samples) -> Samples {
        match template {
            Samples::Int16(_) => Samples::Int16(self.into_i16()),
            Samples::Float32(_) => Samples::Float32(self.into_f32()),
        }
    }

    /// Append another buffer, converting it to this representation
    pub fn append(&mut self, other: Samples) {
        match (self, other) {
            (Samples::Int16(dst), Samples::Int16(src)) => dst.extend(src),
            (Samples::Float32(dst), Samples::Float32(src)) => dst.extend(src),
            (Samples::Int16(dst), src) => dst.extend(src.into_i16()),
            (Samples::Float32(dst), src) => dst.extend(src.into_f32()),
        }
    }

    pub fn into_f32(self) -> Vec<f32> {
        match self {
            Samples::Float32(s) => s,
            Samples::Int16(s) => s.into_iter().map(|v| v as f32 / 32768.0).collect(),
        }
    }

    pub fn into_i16(self) -> Vec<i16> {
        match self {
            Samples::Int16(s) => s,
            Samples::Float32(s) => s.into_iter().map(f32_to_i16).collect(),
        }
    }

    /// 16-bit view for container encoding
    pub fn to_i16(&self) -> Vec<i16> {
        match self {
            Samples::Int16(s) => s.clone(),
            Samples::Float32(s) => s.iter().copied().map(f32_to_i16).collect(),
        }
    }
}

fn f32_to_i16(v: f32) -> i16 {
    (v.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

/// One clause worth of engine output
#[derive(Debug, Clone)]
pub struct AudioSegment {
    pub samples: Samples,
    pub sample_rate: u32,
}

impl AudioSegment {
    pub fn new(samples: Samples, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Number of samples for `seconds` of audio at `sample_rate`
pub fn samples_for(seconds: f64, sample_rate: u32) -> usize {
    (seconds.max(0.0) * sample_rate as f64).round() as usize
}
