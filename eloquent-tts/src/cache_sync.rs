//! Background backup/restore of the compiled-model cache
//!
//! The whole cache directory tree travels as one gzip'd tar archive stored
//! under a fixed key, overwritten on every upload. Readers of the bucket
//! therefore never see a half-updated cache.
//!
//! State machine: `Idle -> Syncing -> Idle`. The transition out of `Idle`
//! happens only while the shared [`BusyFlag`] is clear; a tick that finds the
//! flag set does nothing at all (no filesystem or network access) and the
//! next attempt is the next tick. Every failure is logged and reported as an
//! outcome, never propagated.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use eloquent_common::{Error, ObjectStore, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::pipeline::BusyFlag;

/// Synchroniser settings
#[derive(Debug, Clone)]
pub struct CacheSyncConfig {
    /// Directory tree to back up and restore
    pub cache_dir: PathBuf,
    /// Fixed object key of the archive
    pub archive_key: String,
    /// Time between backup attempts
    pub interval: Duration,
}

/// Synchroniser state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SyncState {
    Idle = 0,
    Syncing = 1,
}

/// Result of one backup attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A job was running; nothing was touched
    SkippedBusy,
    /// Another sync was already in progress
    SkippedSyncing,
    /// Cache directory does not exist yet
    NothingToArchive,
    /// Archive identical to the last upload
    Unchanged,
    Uploaded { bytes: usize },
    Failed(String),
}

impl fmt::Display for TickOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickOutcome::SkippedBusy => write!(f, "skipped: synthesis in progress"),
            TickOutcome::SkippedSyncing => write!(f, "skipped: sync already running"),
            TickOutcome::NothingToArchive => write!(f, "skipped: cache directory missing"),
            TickOutcome::Unchanged => write!(f, "unchanged since last upload"),
            TickOutcome::Uploaded { bytes } => write!(f, "uploaded {} bytes", bytes),
            TickOutcome::Failed(msg) => write!(f, "failed: {}", msg),
        }
    }
}

/// Result of the startup restore
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// No archive in storage yet
    FirstRun,
    Restored { bytes: usize },
    SkippedBusy,
    Failed(String),
}

/// Busy-flag-gated cache synchroniser
pub struct CacheSyncCoordinator {
    store: Arc<dyn ObjectStore>,
    busy: BusyFlag,
    config: CacheSyncConfig,
    state: AtomicU8,
    last_digest: Mutex<Option<Vec<u8>>>,
}

/// Returns the state to `Idle` when dropped
struct SyncingGuard<'a>(&'a AtomicU8);

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(SyncState::Idle as u8, Ordering::SeqCst);
    }
}

impl CacheSyncCoordinator {
    pub fn new(store: Arc<dyn ObjectStore>, busy: BusyFlag, config: CacheSyncConfig) -> Self {
        Self {
            store,
            busy,
            config,
            state: AtomicU8::new(SyncState::Idle as u8),
            last_digest: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CacheSyncConfig {
        &self.config
    }

    pub fn state(&self) -> SyncState {
        if self.state.load(Ordering::SeqCst) == SyncState::Syncing as u8 {
            SyncState::Syncing
        } else {
            SyncState::Idle
        }
    }

    /// Idle -> Syncing, only while no job is running
    fn try_begin(&self) -> std::result::Result<SyncingGuard<'_>, TickOutcome> {
        if self.busy.is_set() {
            return Err(TickOutcome::SkippedBusy);
        }
        self.state
            .compare_exchange(
                SyncState::Idle as u8,
                SyncState::Syncing as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map(|_| SyncingGuard(&self.state))
            .map_err(|_| TickOutcome::SkippedSyncing)
    }

    /// One backup attempt
    pub async fn tick(&self) -> TickOutcome {
        let _guard = match self.try_begin() {
            Ok(guard) => guard,
            Err(outcome) => {
                debug!("Cache sync {}", outcome);
                return outcome;
            }
        };

        let outcome = match self.archive_and_upload().await {
            Ok(outcome) => outcome,
            Err(e) => TickOutcome::Failed(e.to_string()),
        };

        match &outcome {
            TickOutcome::Failed(msg) => warn!("Cache backup failed: {}", msg),
            TickOutcome::Uploaded { .. } => info!("Cache backup {}", outcome),
            _ => debug!("Cache backup {}", outcome),
        }
        outcome
    }

    async fn archive_and_upload(&self) -> Result<TickOutcome> {
        if !tokio::fs::try_exists(&self.config.cache_dir)
            .await
            .unwrap_or(false)
        {
            return Ok(TickOutcome::NothingToArchive);
        }

        let cache_dir = self.config.cache_dir.clone();
        let archive = tokio::task::spawn_blocking(move || build_archive(&cache_dir))
            .await
            .map_err(|e| Error::Internal(format!("archive task failed: {}", e)))??;

        let digest = Sha256::digest(&archive).to_vec();
        let mut last = self.last_digest.lock().await;
        if last.as_ref() == Some(&digest) {
            return Ok(TickOutcome::Unchanged);
        }

        let bytes = archive.len();
        self.store.put(&self.config.archive_key, archive).await?;
        *last = Some(digest);
        Ok(TickOutcome::Uploaded { bytes })
    }

    /// Startup restore: download and unpack the archive if one exists
    pub async fn restore(&self) -> RestoreOutcome {
        let _guard = match self.try_begin() {
            Ok(guard) => guard,
            Err(_) => return RestoreOutcome::SkippedBusy,
        };

        let outcome = match self.download_and_extract().await {
            Ok(outcome) => outcome,
            Err(e) => RestoreOutcome::Failed(e.to_string()),
        };

        match &outcome {
            RestoreOutcome::FirstRun => info!(
                "No cache archive at {}, starting with a cold cache",
                self.config.archive_key
            ),
            RestoreOutcome::Restored { bytes } => info!(
                "Restored cache from {} ({} bytes) into {}",
                self.config.archive_key,
                bytes,
                self.config.cache_dir.display()
            ),
            RestoreOutcome::Failed(msg) => warn!("Cache restore failed: {}", msg),
            RestoreOutcome::SkippedBusy => {}
        }
        outcome
    }

    async fn download_and_extract(&self) -> Result<RestoreOutcome> {
        let Some(archive) = self.store.get(&self.config.archive_key).await? else {
            return Ok(RestoreOutcome::FirstRun);
        };

        let bytes = archive.len();
        let digest = Sha256::digest(&archive).to_vec();
        let cache_dir = self.config.cache_dir.clone();
        tokio::task::spawn_blocking(move || extract_archive(&archive, &cache_dir))
            .await
            .map_err(|e| Error::Internal(format!("extract task failed: {}", e)))??;

        *self.last_digest.lock().await = Some(digest);
        Ok(RestoreOutcome::Restored { bytes })
    }

    /// Spawn the periodic backup loop
    ///
    /// The first attempt happens one interval after start. The loop exits
    /// when `cancel` fires.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        info!(
            "Starting cache sync (interval: {}s, key: {})",
            self.config.interval.as_secs(),
            self.config.archive_key
        );

        tokio::spawn(async move {
            let period = self.config.interval;
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Cache sync stopped");
                        break;
                    }
                    _ = timer.tick() => {
                        self.tick().await;
                    }
                }
            }
        })
    }
}

/// Tar+gzip the cache tree through a temporary file
fn build_archive(cache_dir: &Path) -> Result<Vec<u8>> {
    build_archive_via(cache_dir, &std::env::temp_dir())
}

/// Where the temporary archive is written
///
/// Never inside `cache_dir`, or the archive would contain itself. When the
/// temp directory lies within the cache tree the cache's parent is used.
fn scratch_dir(cache_dir: &Path, temp_dir: &Path) -> Result<PathBuf> {
    let cache = std::fs::canonicalize(cache_dir)?;
    let temp = std::fs::canonicalize(temp_dir).unwrap_or_else(|_| temp_dir.to_path_buf());
    if !temp.starts_with(&cache) {
        return Ok(temp);
    }
    cache.parent().map(Path::to_path_buf).ok_or_else(|| {
        Error::Config(format!(
            "no scratch directory outside cache {}",
            cache.display()
        ))
    })
}

fn build_archive_via(cache_dir: &Path, temp_dir: &Path) -> Result<Vec<u8>> {
    let tmp_path = scratch_dir(cache_dir, temp_dir)?
        .join(format!("eloquent_cache_{}.tar.gz", Uuid::new_v4()));
    let result = write_archive(cache_dir, &tmp_path).and_then(|_| Ok(std::fs::read(&tmp_path)?));
    if let Err(e) = std::fs::remove_file(&tmp_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            error!("Failed to remove {}: {}", tmp_path.display(), e);
        }
    }
    result
}

fn write_archive(cache_dir: &Path, tmp_path: &Path) -> Result<()> {
    let file = std::fs::File::create(tmp_path)?;
    let mut tar = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    tar.follow_symlinks(false);
    tar.append_dir_all(".", cache_dir)
        .map_err(|e| Error::Storage(format!("archive {}: {}", cache_dir.display(), e)))?;
    tar.into_inner()
        .and_then(|gz| gz.finish())
        .map_err(|e| Error::Storage(format!("finish archive: {}", e)))?;
    Ok(())
}

fn extract_archive(archive: &[u8], cache_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(cache_dir)?;
    tar::Archive::new(GzDecoder::new(archive))
        .unpack(cache_dir)
        .map_err(|e| Error::Storage(format!("extract into {}: {}", cache_dir.display(), e)))
}
