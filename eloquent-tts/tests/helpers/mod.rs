//! Test helpers for eloquent-tts integration tests
//!
//! - ToneEngine: deterministic fake synthesis engine that records its calls
//! - CountingStore: in-memory object store that counts every operation
//! - fixtures for building an orchestrator over temp directories

#![allow(dead_code)]

pub mod counting_store;
pub mod tone_engine;

pub use counting_store::CountingStore;
pub use tone_engine::{RecordedCall, ToneEngine};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use eloquent_common::ObjectStore;
use eloquent_tts::engine::{EngineReadiness, SynthesisEngine};
use eloquent_tts::pipeline::{BusyFlag, Orchestrator, OrchestratorSettings};
use eloquent_tts::voice::{ResolverConfig, VoiceResolver};

/// Resolver rooted in `dir` (`cache/` and `presets/` below it)
pub fn resolver(dir: &Path, store: Option<Arc<dyn ObjectStore>>) -> VoiceResolver {
    VoiceResolver::new(
        store,
        ResolverConfig {
            reference_prefix: "references".to_string(),
            cache_dir: dir.join("cache"),
            presets_dir: dir.join("presets"),
        },
    )
}

/// Orchestrator with a ready engine and short admission deadline
pub fn orchestrator(
    dir: &Path,
    engine: Arc<ToneEngine>,
    store: Option<Arc<dyn ObjectStore>>,
) -> Orchestrator {
    orchestrator_with_readiness(dir, engine, store, EngineReadiness::ready())
}

pub fn orchestrator_with_readiness(
    dir: &Path,
    engine: Arc<ToneEngine>,
    store: Option<Arc<dyn ObjectStore>>,
    readiness: EngineReadiness,
) -> Orchestrator {
    Orchestrator::new(
        engine as Arc<dyn SynthesisEngine>,
        resolver(dir, store),
        BusyFlag::new(),
        readiness,
        OrchestratorSettings {
            min_text_chars: 3,
            engine_ready_timeout: Duration::from_millis(100),
        },
    )
}

/// Write a preset voice file
pub fn write_preset(dir: &Path, voice: &str, file: &str, bytes: &[u8]) {
    let preset_dir = dir.join("presets").join(voice);
    std::fs::create_dir_all(&preset_dir).unwrap();
    std::fs::write(preset_dir.join(file), bytes).unwrap();
}
