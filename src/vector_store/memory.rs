use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{normalize_store_name, VectorStoreClient};
use crate::error::{ConsoleError, ConsoleResult};
use crate::models::store::{StoredFile, UploadedFile, VectorStoreSummary};

struct MemoryStore {
    id: String,
    name: String,
    created_at: i64,
    files: Vec<StoredFile>,
}

impl MemoryStore {
    fn summary(&self) -> VectorStoreSummary {
        VectorStoreSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            file_count: self.files.len() as u64,
            created_at: Some(self.created_at),
        }
    }
}

/// Process-local vector store for development and tests. Nothing is embedded;
/// files are only tracked by name and size.
#[derive(Default)]
pub struct MemoryVectorStore {
    stores: Mutex<Vec<MemoryStore>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing_store(store_id: &str) -> ConsoleError {
    ConsoleError::NotFound(format!("Vector store {store_id} not found"))
}

#[async_trait]
impl VectorStoreClient for MemoryVectorStore {
    async fn list_stores(&self) -> ConsoleResult<Vec<VectorStoreSummary>> {
        let stores = self.stores.lock().await;
        Ok(stores.iter().map(MemoryStore::summary).collect())
    }

    async fn create_store(&self, name: &str) -> ConsoleResult<VectorStoreSummary> {
        let name = normalize_store_name(name)?;
        let store = MemoryStore {
            id: format!("vs_{}", uuid::Uuid::new_v4().simple()),
            name,
            created_at: chrono::Utc::now().timestamp(),
            files: Vec::new(),
        };
        let summary = store.summary();
        self.stores.lock().await.push(store);
        Ok(summary)
    }

    async fn get_store(&self, store_id: &str) -> ConsoleResult<Option<VectorStoreSummary>> {
        let stores = self.stores.lock().await;
        Ok(stores.iter().find(|s| s.id == store_id).map(MemoryStore::summary))
    }

    async fn list_files(&self, store_id: &str) -> ConsoleResult<Vec<StoredFile>> {
        let stores = self.stores.lock().await;
        let store = stores
            .iter()
            .find(|s| s.id == store_id)
            .ok_or_else(|| missing_store(store_id))?;
        let mut files = store.files.clone();
        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(files)
    }

    async fn upload_and_ingest(
        &self,
        store_id: &str,
        content: Vec<u8>,
        filename: &str,
    ) -> ConsoleResult<UploadedFile> {
        let mut stores = self.stores.lock().await;
        let store = stores
            .iter_mut()
            .find(|s| s.id == store_id)
            .ok_or_else(|| missing_store(store_id))?;

        let file = StoredFile {
            id: format!("file-{}", uuid::Uuid::new_v4().simple()),
            filename: filename.to_string(),
            bytes: content.len() as u64,
            status: "completed".to_string(),
            created_at: Some(chrono::Utc::now().timestamp()),
        };
        let uploaded = UploadedFile {
            file_id: file.id.clone(),
            status: file.status.clone(),
        };
        store.files.push(file);
        Ok(uploaded)
    }

    async fn delete_file(&self, store_id: &str, file_id: &str) -> ConsoleResult<()> {
        let mut stores = self.stores.lock().await;
        let store = stores
            .iter_mut()
            .find(|s| s.id == store_id)
            .ok_or_else(|| missing_store(store_id))?;

        let before = store.files.len();
        store.files.retain(|f| f.id != file_id);
        if store.files.len() == before {
            return Err(ConsoleError::NotFound(format!(
                "File {file_id} not found in vector store {store_id}"
            )));
        }
        Ok(())
    }

    fn provider_name(&self) -> &str {
        "memory"
    }
}
