//! Voice resolver tier precedence and caching tests

mod helpers;

use std::sync::Arc;

use eloquent_common::ObjectStore;
use eloquent_tts::voice::{ReferenceAudio, ResolutionTier};
use tempfile::TempDir;

use helpers::{resolver, write_preset, CountingStore};

fn explicit(bytes: &[u8], text: &str) -> Vec<ReferenceAudio> {
    vec![ReferenceAudio {
        audio: bytes.to_vec(),
        text: text.to_string(),
    }]
}

#[tokio::test]
async fn test_explicit_beats_everything() {
    let dir = TempDir::new().unwrap();
    write_preset(dir.path(), "bob", "bob.wav", b"preset");
    let store = Arc::new(CountingStore::new());
    store.seed("references/bob/bob.wav", b"remote").await;
    let resolver = resolver(dir.path(), Some(store.clone() as Arc<dyn ObjectStore>));

    let reference = resolver
        .resolve(Some("bob"), &explicit(b"inline", "spoken words"))
        .await
        .unwrap();

    assert_eq!(reference.tier, ResolutionTier::Explicit);
    assert_eq!(reference.audio, b"inline");
    assert_eq!(reference.transcript, "spoken words");
    assert_eq!(store.total(), 0);
}

#[tokio::test]
async fn test_remote_beats_preset_and_is_cached() {
    let dir = TempDir::new().unwrap();
    write_preset(dir.path(), "bob", "bob.wav", b"preset");
    let store = Arc::new(CountingStore::new());
    store.seed("references/bob/bob.wav", b"remote").await;
    store.seed("references/bob/bob.lab", b"  hello from bob \n").await;
    let resolver = resolver(dir.path(), Some(store.clone() as Arc<dyn ObjectStore>));

    let reference = resolver.resolve(Some("bob"), &[]).await.unwrap();
    assert_eq!(reference.tier, ResolutionTier::RemoteStore);
    assert_eq!(reference.audio, b"remote");
    assert_eq!(reference.transcript, "hello from bob");

    let cached_audio = std::fs::read(dir.path().join("cache/bob/bob.wav")).unwrap();
    let cached_lab = std::fs::read_to_string(dir.path().join("cache/bob/bob.lab")).unwrap();
    assert_eq!(cached_audio, b"remote");
    assert_eq!(cached_lab, "hello from bob");

    // Second resolution is served from the local cache without remote calls
    let calls_before = store.total();
    let again = resolver.resolve(Some("bob"), &[]).await.unwrap();
    assert_eq!(again.tier, ResolutionTier::RemoteStore);
    assert_eq!(again.transcript, "hello from bob");
    assert_eq!(store.total(), calls_before);
}

#[tokio::test]
async fn test_txt_transcript_fallback_and_missing_transcript() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(CountingStore::new());
    store.seed("references/amy/amy.wav", b"amy").await;
    store.seed("references/amy/amy.txt", b"from txt").await;
    store.seed("references/zed.flac", b"zed").await;
    let resolver = resolver(dir.path(), Some(store.clone() as Arc<dyn ObjectStore>));

    let amy = resolver.resolve(Some("amy"), &[]).await.unwrap();
    assert_eq!(amy.transcript, "from txt");
    assert!(dir.path().join("cache/amy/amy.lab").exists());

    let zed = resolver.resolve(Some("zed"), &[]).await.unwrap();
    assert_eq!(zed.tier, ResolutionTier::RemoteStore);
    assert_eq!(zed.audio, b"zed");
    assert_eq!(zed.transcript, "");
    assert!(dir.path().join("cache/zed/zed.flac").exists());
}

#[tokio::test]
async fn test_missing_remote_falls_back_to_preset() {
    let dir = TempDir::new().unwrap();
    write_preset(dir.path(), "alice", "sample.wav", b"alice-preset");
    write_preset(dir.path(), "alice", "notes.txt", b"ignored");
    let store = Arc::new(CountingStore::new());
    let resolver = resolver(dir.path(), Some(store.clone() as Arc<dyn ObjectStore>));

    let reference = resolver.resolve(Some("alice"), &[]).await.unwrap();

    assert_eq!(reference.tier, ResolutionTier::LocalPreset);
    assert_eq!(reference.transcript, "");
    assert_eq!(reference.audio, b"alice-preset");
    assert!(store.gets() > 0);
}

#[tokio::test]
async fn test_preset_picks_first_audio_file_by_name() {
    let dir = TempDir::new().unwrap();
    write_preset(dir.path(), "kim", "b.mp3", b"second");
    write_preset(dir.path(), "kim", "a.wav", b"first");
    let resolver = resolver(dir.path(), None);

    let reference = resolver.resolve(Some("kim"), &[]).await.unwrap();
    assert_eq!(reference.audio, b"first");
}

#[tokio::test]
async fn test_unknown_voice_resolves_to_none() {
    let dir = TempDir::new().unwrap();
    let resolver = resolver(dir.path(), Some(Arc::new(CountingStore::new()) as Arc<dyn ObjectStore>));

    assert!(resolver.resolve(Some("nobody"), &[]).await.is_none());
    assert!(resolver.resolve(Some("none"), &[]).await.is_none());
}

#[tokio::test]
async fn test_traversal_ids_stay_inside_directories() {
    let dir = TempDir::new().unwrap();
    let presets = dir.path().join("presets");
    std::fs::create_dir_all(&presets).unwrap();
    // A file outside the presets tree that a naive join would reach
    std::fs::create_dir_all(dir.path().join("secret")).unwrap();
    std::fs::write(dir.path().join("secret/key.wav"), b"secret").unwrap();

    let resolver = resolver(dir.path(), None);
    assert!(resolver.resolve(Some("../secret"), &[]).await.is_none());
}

#[tokio::test]
async fn test_concurrent_first_resolution_of_same_voice() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(CountingStore::new());
    store.seed("references/eve/eve.wav", b"eve-audio").await;
    let resolver = Arc::new(resolver(dir.path(), Some(store.clone() as Arc<dyn ObjectStore>)));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve(Some("eve"), &[]).await })
        })
        .collect();
    for task in tasks {
        let reference = task.await.unwrap().unwrap();
        assert_eq!(reference.audio, b"eve-audio");
    }

    // Only the first resolver downloaded: one audio get plus two transcript probes
    assert_eq!(store.gets(), 3);
    assert_eq!(
        std::fs::read(dir.path().join("cache/eve/eve.wav")).unwrap(),
        b"eve-audio"
    );
}
