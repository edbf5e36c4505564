//! Cache synchroniser tests against the busy flag and the job API

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use eloquent_common::ObjectStore;
use eloquent_tts::cache_sync::{CacheSyncConfig, CacheSyncCoordinator, RestoreOutcome, TickOutcome};
use eloquent_tts::pipeline::{BusyFlag, JobInput, JobStatus};
use tempfile::TempDir;

use helpers::{orchestrator, CountingStore, ToneEngine};

const ARCHIVE_KEY: &str = "cache/compile_cache.tar.gz";

fn coordinator(cache_dir: &std::path::Path, store: Arc<CountingStore>, busy: BusyFlag) -> CacheSyncCoordinator {
    CacheSyncCoordinator::new(
        store as Arc<dyn ObjectStore>,
        busy,
        CacheSyncConfig {
            cache_dir: cache_dir.to_path_buf(),
            archive_key: ARCHIVE_KEY.to_string(),
            interval: Duration::from_secs(3600),
        },
    )
}

fn populate_cache(dir: &std::path::Path) {
    std::fs::create_dir_all(dir.join("kernels")).unwrap();
    std::fs::write(dir.join("kernels/attention.bin"), vec![7u8; 2048]).unwrap();
    std::fs::write(dir.join("index.json"), b"{\"entries\":1}").unwrap();
}

#[tokio::test]
async fn test_tick_while_busy_touches_nothing() {
    let dir = TempDir::new().unwrap();
    let cache_dir = dir.path().join("compile_cache");
    populate_cache(&cache_dir);
    let store = Arc::new(CountingStore::new());
    let busy = BusyFlag::new();
    let sync = coordinator(&cache_dir, store.clone(), busy.clone());

    let guard = busy.enter();
    assert_eq!(sync.tick().await, TickOutcome::SkippedBusy);
    assert_eq!(sync.restore().await, RestoreOutcome::SkippedBusy);
    assert_eq!(store.total(), 0);

    drop(guard);
    assert!(matches!(sync.tick().await, TickOutcome::Uploaded { .. }));
    assert_eq!(store.puts(), 1);
}

#[tokio::test]
async fn test_backup_restores_into_fresh_directory() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("source");
    populate_cache(&source);
    let store = Arc::new(CountingStore::new());

    let first = coordinator(&source, store.clone(), BusyFlag::new());
    assert!(matches!(first.tick().await, TickOutcome::Uploaded { .. }));
    assert_eq!(first.tick().await, TickOutcome::Unchanged);
    assert_eq!(store.puts(), 1);

    let target = dir.path().join("target");
    let second = coordinator(&target, store.clone(), BusyFlag::new());
    assert!(matches!(second.restore().await, RestoreOutcome::Restored { .. }));
    assert_eq!(
        std::fs::read(target.join("kernels/attention.bin")).unwrap(),
        vec![7u8; 2048]
    );
    assert_eq!(
        std::fs::read_to_string(target.join("index.json")).unwrap(),
        "{\"entries\":1}"
    );
}

#[tokio::test]
async fn test_sync_cache_task_respects_running_job() {
    let dir = TempDir::new().unwrap();
    let cache_dir = dir.path().join("compile_cache");
    populate_cache(&cache_dir);
    let store = Arc::new(CountingStore::new());

    let orch = orchestrator(dir.path(), Arc::new(ToneEngine::new()), None);
    let sync = Arc::new(coordinator(&cache_dir, store.clone(), orch.busy().clone()));
    let orch = orch.with_cache_sync(sync);

    let input = || JobInput {
        task: Some("sync_cache".to_string()),
        ..Default::default()
    };

    let guard = orch.busy().enter();
    let skipped = orch.handle(input()).await.unwrap();
    assert_eq!(skipped.status, JobStatus::Success);
    assert_eq!(
        skipped.message.as_deref(),
        Some("Cache sync skipped: synthesis in progress")
    );
    assert_eq!(store.total(), 0);
    drop(guard);

    let uploaded = orch.handle(input()).await.unwrap();
    assert!(uploaded
        .message
        .as_deref()
        .unwrap()
        .starts_with("Cache sync uploaded"));
    assert_eq!(store.puts(), 1);
}

#[tokio::test]
async fn test_job_blocks_sync_until_finished() {
    let dir = TempDir::new().unwrap();
    let cache_dir = dir.path().join("compile_cache");
    populate_cache(&cache_dir);
    let store = Arc::new(CountingStore::new());

    let orch = orchestrator(dir.path(), Arc::new(ToneEngine::new()), None);
    let sync = coordinator(&cache_dir, store.clone(), orch.busy().clone());

    let output = orch
        .handle(JobInput {
            text: Some("A short sentence to speak.".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(output.status, JobStatus::Success);

    // The busy flag is released once the job returns
    assert!(!orch.busy().is_set());
    assert!(matches!(sync.tick().await, TickOutcome::Uploaded { .. }));
}
