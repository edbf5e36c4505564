//! Tiered voice reference resolution
//!
//! Tiers are tried in order, first success wins:
//! 1. Explicit: reference pairs carried by the request
//! 2. RemoteStore: local cache, then object storage (cached on success)
//! 3. LocalPreset: first audio file in `<presets_dir>/<voice_id>/`
//! 4. None: engine default voice
//!
//! Each tier returns `Option`; failures inside a tier are logged and the
//! next tier is consulted. Nothing here fails a job.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use eloquent_common::ObjectStore;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    has_audio_extension, is_reserved_voice_id, sanitize_voice_id, ReferenceAudio,
    ResolutionTier, VoiceReference, AUDIO_EXTENSIONS, TRANSCRIPT_EXTENSIONS,
};

/// Resolver locations
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Object key prefix holding reference voices (no trailing `/`)
    pub reference_prefix: String,
    /// Local cache of downloaded references
    pub cache_dir: PathBuf,
    /// Local preset voices, one directory per voice
    pub presets_dir: PathBuf,
}

/// Voice reference resolver
pub struct VoiceResolver {
    store: Option<Arc<dyn ObjectStore>>,
    config: ResolverConfig,
    /// Per-voice cache write locks
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl VoiceResolver {
    /// `store` is `None` when no object storage is configured
    pub fn new(store: Option<Arc<dyn ObjectStore>>, config: ResolverConfig) -> Self {
        Self {
            store,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn store(&self) -> Option<&Arc<dyn ObjectStore>> {
        self.store.as_ref()
    }

    /// Resolve the reference for one job
    ///
    /// `None` means the engine default voice.
    pub async fn resolve(
        &self,
        voice_id: Option<&str>,
        explicit: &[ReferenceAudio],
    ) -> Option<Arc<VoiceReference>> {
        if let Some(reference) = explicit_tier(explicit) {
            return Some(Arc::new(reference));
        }

        let raw_id = voice_id.map(str::trim).filter(|id| !id.is_empty())?;
        if is_reserved_voice_id(raw_id) {
            debug!("Voice id {:?} selects the engine default voice", raw_id);
            return None;
        }

        let (stem, preferred_ext) = split_audio_extension(raw_id);
        let key = sanitize_voice_id(stem);
        if key.is_empty() {
            warn!("Voice id {:?} has no usable characters, using default voice", raw_id);
            return None;
        }

        if let Some(reference) = self.remote_tier(&key, preferred_ext).await {
            return Some(Arc::new(reference));
        }
        if let Some(reference) = self.preset_tier(&key).await {
            return Some(Arc::new(reference));
        }

        info!("Voice {:?} not found in any tier, using default voice", key);
        None
    }

    async fn remote_tier(&self, key: &str, preferred_ext: Option<&str>) -> Option<VoiceReference> {
        let Some(store) = self.store.as_ref() else {
            return self.read_cache(key).await;
        };

        let lock = self.lock_for(key).await;
        let reference = {
            let _guard = lock.lock().await;
            self.cached_or_download(store.as_ref(), key, preferred_ext).await
        };
        self.release_lock(key, lock).await;
        reference
    }

    async fn cached_or_download(
        &self,
        store: &dyn ObjectStore,
        key: &str,
        preferred_ext: Option<&str>,
    ) -> Option<VoiceReference> {
        if let Some(reference) = self.read_cache(key).await {
            debug!("Voice {:?} served from local cache", key);
            return Some(reference);
        }

        for candidate in self.candidate_keys(key, preferred_ext) {
            let audio = match store.get(&candidate).await {
                Ok(Some(audio)) if !audio.is_empty() => audio,
                Ok(_) => continue,
                Err(e) => {
                    warn!("Remote lookup of {} failed: {}", candidate, e);
                    continue;
                }
            };

            let transcript = fetch_transcript(store, &candidate).await;
            let ext = extension_of(&candidate).unwrap_or("wav");
            if let Err(e) = self.write_cache(key, ext, &audio, &transcript).await {
                warn!("Failed to cache voice {:?}: {}", key, e);
            }

            info!(
                "Voice {:?} downloaded from {} ({} bytes, transcript {} chars)",
                key,
                candidate,
                audio.len(),
                transcript.chars().count()
            );
            return Some(VoiceReference::new(audio, transcript, ResolutionTier::RemoteStore));
        }

        debug!("Voice {:?} not found in {}", key, store.name());
        None
    }

    async fn preset_tier(&self, key: &str) -> Option<VoiceReference> {
        let dir = self.config.presets_dir.join(key);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!("No preset directory {}: {}", dir.display(), e);
                return None;
            }
        };

        let mut names = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
                    if is_file && has_audio_extension(&name) {
                        names.push(name);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to scan preset directory {}: {}", dir.display(), e);
                    break;
                }
            }
        }
        names.sort();

        for name in names {
            let path = dir.join(&name);
            match tokio::fs::read(&path).await {
                Ok(audio) => {
                    debug!("Voice {:?} resolved to preset {}", key, path.display());
                    return Some(VoiceReference::new(
                        audio,
                        String::new(),
                        ResolutionTier::LocalPreset,
                    ));
                }
                Err(e) => warn!("Failed to read preset {}: {}", path.display(), e),
            }
        }
        None
    }

    /// Remote keys to try, most specific first
    fn candidate_keys(&self, key: &str, preferred_ext: Option<&str>) -> Vec<String> {
        let prefix = self.config.reference_prefix.trim_end_matches('/');
        let mut extensions: Vec<&str> = preferred_ext.into_iter().collect();
        extensions.extend(
            AUDIO_EXTENSIONS
                .iter()
                .copied()
                .filter(|e| Some(*e) != preferred_ext),
        );

        let nested = extensions
            .iter()
            .map(|ext| format!("{}/{}/{}.{}", prefix, key, key, ext));
        let flat = extensions
            .iter()
            .map(|ext| format!("{}/{}.{}", prefix, key, ext));
        nested.chain(flat).collect()
    }

    async fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(key.to_string()).or_default().clone()
    }

    /// Drop our handle and forget the lock once nobody else holds it
    async fn release_lock(&self, key: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        drop(lock);
        if locks
            .get(key)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(key);
        }
    }

    fn cache_paths(&self, key: &str, ext: &str) -> (PathBuf, PathBuf) {
        let dir = self.config.cache_dir.join(key);
        (
            dir.join(format!("{}.{}", key, ext)),
            dir.join(format!("{}.lab", key)),
        )
    }

    async fn read_cache(&self, key: &str) -> Option<VoiceReference> {
        for ext in AUDIO_EXTENSIONS {
            let (audio_path, transcript_path) = self.cache_paths(key, ext);
            let audio = match tokio::fs::read(&audio_path).await {
                Ok(audio) if !audio.is_empty() => audio,
                _ => continue,
            };
            let transcript = tokio::fs::read_to_string(&transcript_path)
                .await
                .unwrap_or_default();
            return Some(VoiceReference::new(
                audio,
                transcript.trim(),
                ResolutionTier::RemoteStore,
            ));
        }
        None
    }

    /// First-write-wins: an existing cache entry is never replaced
    async fn write_cache(
        &self,
        key: &str,
        ext: &str,
        audio: &[u8],
        transcript: &str,
    ) -> std::io::Result<()> {
        let (audio_path, transcript_path) = self.cache_paths(key, ext);
        if let Some(parent) = audio_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Transcript first so a visible audio file always has its transcript
        if !transcript.is_empty() {
            write_atomic(&transcript_path, transcript.as_bytes()).await?;
        }
        if tokio::fs::metadata(&audio_path).await.is_err() {
            write_atomic(&audio_path, audio).await?;
        }
        Ok(())
    }
}

fn explicit_tier(explicit: &[ReferenceAudio]) -> Option<VoiceReference> {
    let mut usable = explicit.iter().filter(|r| !r.audio.is_empty());
    let first = usable.next()?;

    let ignored = usable.count();
    if ignored > 0 {
        debug!("Using first explicit reference, ignoring {} more", ignored);
    }
    Some(VoiceReference::new(
        first.audio.clone(),
        first.text.clone(),
        ResolutionTier::Explicit,
    ))
}

/// Paired transcript at the sibling key, `.lab` before `.txt`
async fn fetch_transcript(store: &dyn ObjectStore, audio_key: &str) -> String {
    let stem = audio_key
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(audio_key);

    for ext in TRANSCRIPT_EXTENSIONS {
        let key = format!("{}.{}", stem, ext);
        match store.get(&key).await {
            Ok(Some(bytes)) => return String::from_utf8_lossy(&bytes).trim().to_string(),
            Ok(None) => {}
            Err(e) => debug!("Transcript lookup {} failed: {}", key, e),
        }
    }
    debug!("No transcript next to {}, using empty transcript", audio_key);
    String::new()
}

/// `alice.wav` -> (`alice`, Some(`wav`)); anything else is returned whole
fn split_audio_extension(voice_id: &str) -> (&str, Option<&'static str>) {
    if let Some((stem, ext)) = voice_id.rsplit_once('.') {
        if let Some(known) = AUDIO_EXTENSIONS
            .iter()
            .copied()
            .find(|a| a.eq_ignore_ascii_case(ext))
        {
            return (stem, Some(known));
        }
    }
    (voice_id, None)
}

fn extension_of(key: &str) -> Option<&str> {
    key.rsplit_once('.').map(|(_, ext)| ext)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension(format!("{}.partial", Uuid::new_v4().simple()));
    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}
