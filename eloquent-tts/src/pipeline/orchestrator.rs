//! Job orchestration
//!
//! The [`Orchestrator`] is built once at startup and owns the engine handle,
//! voice resolver, busy flag, readiness signal and the job gate. Both the
//! HTTP front end and the cache synchroniser reach shared state through it
//! (the synchroniser holds a clone of the same [`BusyFlag`]).
//!
//! One TTS job:
//! 1. validate input (length, format, references), preprocess, and check
//!    that something speakable remains
//! 2. wait for engine readiness (bounded)
//! 3. take the job gate (FIFO), raise the busy flag
//! 4. resolve the voice once
//! 5. segment, assign prosody, dispatch clauses in order
//! 6. stitch, encode, return base64 audio

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{info, warn};

use super::busy::BusyFlag;
use super::dispatcher::{ChunkDispatcher, DispatchStats};
use super::request::{JobInput, JobOutput, SynthesisRequest, Task};
use crate::audio::{encode, AudioStitcher};
use crate::cache_sync::CacheSyncCoordinator;
use crate::engine::{EngineReadiness, SynthesisEngine};
use crate::error::{JobError, JobResult};
use crate::prosody::ProsodyPolicy;
use crate::text::{preprocess, segment};
use crate::voice::{list_voices, ResolutionTier, VoiceResolver};

/// Job admission settings
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Minimum trimmed text length, in characters
    pub min_text_chars: usize,
    /// How long a job waits for the engine to become ready
    pub engine_ready_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            min_text_chars: 3,
            engine_ready_timeout: Duration::from_secs(120),
        }
    }
}

/// Finished synthesis
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    pub audio: Vec<u8>,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub tier: ResolutionTier,
    pub stats: DispatchStats,
}

pub struct Orchestrator {
    engine: Arc<dyn SynthesisEngine>,
    resolver: VoiceResolver,
    busy: BusyFlag,
    readiness: EngineReadiness,
    /// Serialises jobs against the single engine instance
    gate: Mutex<()>,
    settings: OrchestratorSettings,
    cache_sync: Option<Arc<CacheSyncCoordinator>>,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn SynthesisEngine>,
        resolver: VoiceResolver,
        busy: BusyFlag,
        readiness: EngineReadiness,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            engine,
            resolver,
            busy,
            readiness,
            gate: Mutex::new(()),
            settings,
            cache_sync: None,
        }
    }

    /// Attach the cache synchroniser used by the `sync_cache` task
    pub fn with_cache_sync(mut self, cache_sync: Arc<CacheSyncCoordinator>) -> Self {
        self.cache_sync = Some(cache_sync);
        self
    }

    pub fn busy(&self) -> &BusyFlag {
        &self.busy
    }

    pub fn readiness(&self) -> &EngineReadiness {
        &self.readiness
    }

    /// Run one job of any task kind
    pub async fn handle(&self, input: JobInput) -> JobResult<JobOutput> {
        match input.task()? {
            Task::Tts => {
                let request = input.into_request(self.settings.min_text_chars)?;
                let format = request.format;
                let output = self.synthesize(request).await?;
                Ok(JobOutput::audio(&output.audio, format, output.duration_secs))
            }
            Task::ListVoices => {
                let config = self.resolver.config();
                let voices = list_voices(
                    self.resolver.store().map(|s| s.as_ref()),
                    &config.reference_prefix,
                    &config.presets_dir,
                )
                .await;
                Ok(JobOutput::voices(voices))
            }
            Task::SyncCache => match &self.cache_sync {
                Some(sync) => Ok(JobOutput::message(format!("Cache sync {}", sync.tick().await))),
                None => Ok(JobOutput::message("Cache sync is disabled")),
            },
        }
    }

    /// Synthesize a validated request
    pub async fn synthesize(&self, request: SynthesisRequest) -> JobResult<SynthesisOutput> {
        let started = Instant::now();

        let text = preprocess(&request.text);
        if !segment(&text).any(|clause| clause.is_speakable()) {
            return Err(JobError::Validation(
                "Text has nothing to speak after preprocessing".to_string(),
            ));
        }

        if !self
            .readiness
            .wait(self.settings.engine_ready_timeout)
            .await
        {
            warn!(
                "Engine not ready after {:?}, rejecting job",
                self.settings.engine_ready_timeout
            );
            return Err(JobError::InitializationTimeout(
                self.settings.engine_ready_timeout,
            ));
        }

        let _gate = self.gate.lock().await;
        let _busy = self.busy.enter();

        let reference = self
            .resolver
            .resolve(request.voice_id.as_deref(), &request.references)
            .await;
        let tier = reference
            .as_ref()
            .map(|r| r.tier)
            .unwrap_or(ResolutionTier::None);

        let mut policy = ProsodyPolicy::new(request.params.seed);
        let mut stitcher = AudioStitcher::new(request.pause_amount);
        let dispatcher = ChunkDispatcher::new(
            self.engine.as_ref(),
            reference,
            request.params.clone(),
            request.speed,
        );
        let stats = dispatcher
            .run(policy.annotate(segment(&text)), &mut stitcher)
            .await?;

        let stitched = stitcher.finish()?;
        let audio = encode(&stitched, request.format)?;
        let duration_secs = stitched.duration_secs();

        info!(
            clauses = stats.clauses,
            synthesized = stats.synthesized,
            paragraphs = stats.paragraph_breaks + 1,
            tier = %tier,
            duration_secs = %format!("{:.2}", duration_secs),
            bytes = audio.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "TTS job complete"
        );

        Ok(SynthesisOutput {
            audio,
            duration_secs,
            sample_rate: stitched.sample_rate,
            tier,
            stats,
        })
    }
}
