//! Object store wrapper that counts operations

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use eloquent_common::{MemoryObjectStore, ObjectStore, Result};

#[derive(Default)]
pub struct CountingStore {
    inner: MemoryObjectStore,
    gets: AtomicUsize,
    puts: AtomicUsize,
    lists: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without counting it
    pub async fn seed(&self, key: &str, bytes: &[u8]) {
        self.inner.put(key, bytes.to_vec()).await.unwrap();
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.gets() + self.puts() + self.lists()
    }
}

#[async_trait]
impl ObjectStore for CountingStore {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, bytes).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list(prefix).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.exists(key).await
    }
}
