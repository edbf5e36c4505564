//! Object storage abstraction
//!
//! Services talk to remote storage only through [`ObjectStore`]: flat string
//! keys using `/` separators, whole-object get/put, and prefix listing.
//!
//! Two backends ship here:
//! - [`FsObjectStore`]: a directory standing in for the bucket (mounted
//!   volume, synced bucket, local development)
//! - [`MemoryObjectStore`]: process-local map, used by tests and ephemeral runs

use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

/// Remote object storage primitives
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Backend identifier for logs
    fn name(&self) -> &'static str;

    /// Fetch an object. `Ok(None)` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store an object, overwriting any previous value under `key`
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// List all keys starting with `prefix`, sorted
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Check whether a key exists
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Directory-backed object store
///
/// Key `a/b/c.wav` maps to `<root>/a/b/c.wav`. Keys containing `..`, root or
/// drive components are rejected.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let clean = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(Error::InvalidInput(format!("Invalid object key: {:?}", key)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            // A directory at the key's location is "no object", not a failure
            Err(_) if path.is_dir() => Ok(None),
            Err(e) => Err(Error::Storage(format!("get {}: {}", key, e))),
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write-then-rename so readers never observe a partial object
        let tmp = path.with_extension(format!(
            "{}.partial",
            path.extension().and_then(|e| e.to_str()).unwrap_or("obj")
        ));
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| Error::Storage(format!("put {}: {}", key, e)))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Error::Storage(format!("put {}: {}", key, e)))?;

        debug!("Stored {} ({} bytes)", key, bytes.len());
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let root = self.root.clone();
        let prefix = prefix.to_string();
        tokio::task::spawn_blocking(move || list_files(&root, &prefix))
            .await
            .map_err(|e| Error::Internal(format!("list task failed: {}", e)))?
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        Ok(tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false))
    }
}

fn list_files(root: &Path, prefix: &str) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    if !root.exists() {
        return Ok(keys);
    }

    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                pending.push(path);
                continue;
            }

            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if key.starts_with(prefix) && !key.ends_with(".partial") {
                keys.push(key);
            }
        }
    }

    keys.sort();
    Ok(keys)
}

/// In-memory object store
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.objects.write().await.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .objects
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.read().await.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip_and_overwrite() {
        let store = MemoryObjectStore::new();
        assert!(store.get("a").await.unwrap().is_none());

        store.put("a", vec![1, 2]).await.unwrap();
        store.put("a", vec![3]).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), Some(vec![3]));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_memory_store_list_by_prefix() {
        let store = MemoryObjectStore::new();
        store.put("references/bob/bob.wav", vec![]).await.unwrap();
        store.put("references/amy/amy.wav", vec![]).await.unwrap();
        store.put("cache/archive.tar.gz", vec![]).await.unwrap();

        let keys = store.list("references/").await.unwrap();
        assert_eq!(keys, vec!["references/amy/amy.wav", "references/bob/bob.wav"]);
    }

    #[test]
    fn test_fs_store_rejects_traversal_keys() {
        let store = FsObjectStore::new("/tmp/bucket");
        assert!(store.path_for("../etc/passwd").is_err());
        assert!(store.path_for("/etc/passwd").is_err());
        assert!(store.path_for("").is_err());
        assert!(store.path_for("references/a/a.wav").is_ok());
    }
}
