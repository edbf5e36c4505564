//! Clause stitching
//!
//! Accumulates, in clause order, each clause waveform followed by its pause
//! as zero-valued samples, plus an extra silence at every non-final paragraph
//! boundary. Silence lengths are `round(seconds * sample_rate)` and are only
//! materialised in `finish`, once the engine sample rate is known, so a
//! leading punctuation-only clause still gets its pause.
//!
//! Output length invariant: total samples == sum of clause samples + sum of
//! rounded silence samples.

use super::{samples_for, AudioSegment, Samples};
use crate::error::{JobError, JobResult};

/// Longest output a job may produce
pub const MAX_OUTPUT_SECS: f64 = 3.0 * 60.0 * 60.0;

enum Part {
    Audio(Samples),
    Silence(f64),
}

/// Ordered collector of clause audio and pauses
pub struct AudioStitcher {
    parts: Vec<Part>,
    template: Option<Samples>,
    sample_rate: Option<u32>,
    pause_scale: f64,
}

/// Final joined waveform
#[derive(Debug, Clone)]
pub struct StitchedAudio {
    pub samples: Samples,
    pub sample_rate: u32,
    /// Samples that came from the engine
    pub speech_samples: usize,
    /// Samples of inserted silence
    pub silence_samples: usize,
}

impl StitchedAudio {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

impl AudioStitcher {
    /// `pause_scale` multiplies every inserted silence (request `pauseAmount`)
    pub fn new(pause_scale: f64) -> Self {
        Self {
            parts: Vec::new(),
            template: None,
            sample_rate: None,
            pause_scale: pause_scale.max(0.0),
        }
    }

    /// Append one clause: its waveform (if the engine produced one) and its pause
    pub fn push_clause(&mut self, audio: Option<AudioSegment>, pause_secs: f64) -> JobResult<()> {
        if let Some(segment) = audio.filter(|s| !s.samples.is_empty()) {
            match self.sample_rate {
                None => self.sample_rate = Some(segment.sample_rate),
                Some(rate) if rate != segment.sample_rate => {
                    return Err(JobError::Stitch(format!(
                        "sample rate changed mid-job: {} Hz then {} Hz",
                        rate, segment.sample_rate
                    )));
                }
                Some(_) => {}
            }

            let samples = match &self.template {
                None => {
                    self.template = Some(segment.samples.silence_like(0));
                    segment.samples
                }
                Some(template) => segment.samples.convert_like(template),
            };
            self.parts.push(Part::Audio(samples));
        }

        self.push_silence(pause_secs);
        Ok(())
    }

    /// Append the extra pause between two paragraphs
    pub fn push_paragraph_break(&mut self, pause_secs: f64) {
        self.push_silence(pause_secs);
    }

    fn push_silence(&mut self, pause_secs: f64) {
        let seconds = pause_secs * self.pause_scale;
        if seconds > 0.0 {
            self.parts.push(Part::Silence(seconds));
        }
    }

    /// Concatenate every part in order
    ///
    /// Fails when no clause produced audio, or when the output would run
    /// longer than [`MAX_OUTPUT_SECS`]. Lengths are checked before any
    /// silence is allocated.
    pub fn finish(self) -> JobResult<StitchedAudio> {
        let (Some(template), Some(sample_rate)) = (self.template, self.sample_rate) else {
            return Err(JobError::Stitch("no clause produced audio".to_string()));
        };

        let max_samples = samples_for(MAX_OUTPUT_SECS, sample_rate);
        let mut speech_samples = 0usize;
        let mut silence_samples = 0usize;
        for part in &self.parts {
            match part {
                Part::Audio(chunk) => speech_samples += chunk.len(),
                Part::Silence(seconds) => {
                    if *seconds > MAX_OUTPUT_SECS {
                        return Err(too_long(*seconds));
                    }
                    silence_samples += samples_for(*seconds, sample_rate);
                }
            }
        }
        let total = speech_samples + silence_samples;
        if total > max_samples {
            return Err(too_long(total as f64 / sample_rate as f64));
        }

        let mut samples = template;
        for part in self.parts {
            match part {
                Part::Audio(chunk) => samples.append(chunk),
                Part::Silence(seconds) => {
                    let silence = samples.silence_like(samples_for(seconds, sample_rate));
                    samples.append(silence);
                }
            }
        }

        Ok(StitchedAudio {
            samples,
            sample_rate,
            speech_samples,
            silence_samples,
        })
    }
}

fn too_long(seconds: f64) -> JobError {
    JobError::Stitch(format!(
        "output of {:.0}s exceeds the {:.0}s limit",
        seconds, MAX_OUTPUT_SECS
    ))
}
