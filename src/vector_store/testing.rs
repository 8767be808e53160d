use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::memory::MemoryVectorStore;
use super::VectorStoreClient;
use crate::error::{ConsoleError, ConsoleResult};
use crate::models::store::{StoredFile, UploadedFile, VectorStoreSummary};

/// In-memory client that counts provider calls and can fail chosen deletes.
#[derive(Default)]
pub struct CountingVectorStore {
    inner: MemoryVectorStore,
    calls: AtomicUsize,
    failing_deletes: Mutex<HashSet<String>>,
}

impl CountingVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of provider calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    /// Make every later delete of `file_id` fail.
    pub fn fail_delete_of(&self, file_id: &str) {
        if let Ok(mut set) = self.failing_deletes.lock() {
            set.insert(file_id.to_string());
        }
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl VectorStoreClient for CountingVectorStore {
    async fn list_stores(&self) -> ConsoleResult<Vec<VectorStoreSummary>> {
        self.hit();
        self.inner.list_stores().await
    }

    async fn create_store(&self, name: &str) -> ConsoleResult<VectorStoreSummary> {
        self.hit();
        self.inner.create_store(name).await
    }

    async fn get_store(&self, store_id: &str) -> ConsoleResult<Option<VectorStoreSummary>> {
        self.hit();
        self.inner.get_store(store_id).await
    }

    async fn list_files(&self, store_id: &str) -> ConsoleResult<Vec<StoredFile>> {
        self.hit();
        self.inner.list_files(store_id).await
    }

    async fn upload_and_ingest(
        &self,
        store_id: &str,
        content: Vec<u8>,
        filename: &str,
    ) -> ConsoleResult<UploadedFile> {
        self.hit();
        self.inner.upload_and_ingest(store_id, content, filename).await
    }

    async fn delete_file(&self, store_id: &str, file_id: &str) -> ConsoleResult<()> {
        self.hit();
        let fails = self
            .failing_deletes
            .lock()
            .map(|set| set.contains(file_id))
            .unwrap_or(false);
        if fails {
            return Err(ConsoleError::external("simulated delete failure"));
        }
        self.inner.delete_file(store_id, file_id).await
    }

    fn provider_name(&self) -> &str {
        "counting"
    }
}
