//! Per-clause engine dispatch
//!
//! Clauses are sent one at a time, in order, and each call completes before
//! the next starts. The engine is stateful and shared, and the stitched
//! output depends on order.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::audio::{AudioSegment, AudioStitcher};
use crate::engine::{EngineRequest, GenerationParams, SynthesisEngine};
use crate::error::{JobError, JobResult};
use crate::prosody::Clause;
use crate::voice::VoiceReference;

/// Counters for one dispatched job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub clauses: usize,
    /// Clauses sent to the engine
    pub synthesized: usize,
    /// Punctuation-only clauses that contributed silence only
    pub silent: usize,
    pub paragraph_breaks: usize,
}

/// Sequential clause dispatcher for one job
pub struct ChunkDispatcher<'e> {
    engine: &'e dyn SynthesisEngine,
    reference: Option<Arc<VoiceReference>>,
    params: GenerationParams,
    speed_scale: f64,
}

impl<'e> ChunkDispatcher<'e> {
    /// `speed_scale` is the request-level speed, applied on top of clause speed
    pub fn new(
        engine: &'e dyn SynthesisEngine,
        reference: Option<Arc<VoiceReference>>,
        params: GenerationParams,
        speed_scale: f64,
    ) -> Self {
        Self {
            engine,
            reference,
            params,
            speed_scale,
        }
    }

    /// Synthesize one clause; `None` for clauses with nothing to pronounce
    pub async fn dispatch(&self, clause: &Clause<'_>) -> JobResult<Option<AudioSegment>> {
        if !clause.span.is_speakable() {
            return Ok(None);
        }

        let request = EngineRequest {
            text: clause.span.text(),
            reference: self.reference.clone(),
            speed: clause.speed * self.speed_scale,
            params: self.params.clone(),
        };

        let started = Instant::now();
        let segment = self
            .engine
            .synthesize(&request)
            .await
            .map_err(|source| JobError::Synthesis {
                clause: clause.span.index,
                source,
            })?;

        debug!(
            clause = clause.span.index,
            class = %clause.span.class,
            speed = request.speed,
            pause = clause.pause_secs,
            audio_secs = segment.duration_secs(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Clause synthesized"
        );
        Ok(Some(segment))
    }

    /// Dispatch every clause in order, feeding audio and pauses to `stitcher`
    ///
    /// Stops at the first engine failure.
    pub async fn run<'a, I>(&self, clauses: I, stitcher: &mut AudioStitcher) -> JobResult<DispatchStats>
    where
        I: IntoIterator<Item = Clause<'a>>,
    {
        let mut stats = DispatchStats::default();

        for clause in clauses {
            let audio = self.dispatch(&clause).await?;
            stats.clauses += 1;
            if audio.is_some() {
                stats.synthesized += 1;
            } else {
                stats.silent += 1;
            }

            stitcher.push_clause(audio, clause.pause_secs)?;
            if let Some(pause) = clause.paragraph_pause_secs {
                stitcher.push_paragraph_break(pause);
                stats.paragraph_breaks += 1;
            }
        }

        Ok(stats)
    }
}
