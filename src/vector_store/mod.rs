pub mod memory;
pub mod openai;

#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{ConsoleError, ConsoleResult};
use crate::models::store::{DeleteOutcome, StoredFile, UploadedFile, VectorStoreSummary};

/// Client for an externally hosted vector store.
///
/// Every stored file is scoped to one store, so file operations always take
/// the owning store ID.
#[async_trait]
pub trait VectorStoreClient: Send + Sync {
    /// List every store visible to the API key.
    async fn list_stores(&self) -> ConsoleResult<Vec<VectorStoreSummary>>;

    /// Create an empty store. Blank names are rejected.
    async fn create_store(&self, name: &str) -> ConsoleResult<VectorStoreSummary>;

    /// Fetch one store, `None` when it does not exist.
    async fn get_store(&self, store_id: &str) -> ConsoleResult<Option<VectorStoreSummary>>;

    /// List a store's files sorted by filename.
    async fn list_files(&self, store_id: &str) -> ConsoleResult<Vec<StoredFile>>;

    /// Upload raw bytes and attach them to a store, waiting for processing.
    async fn upload_and_ingest(
        &self,
        store_id: &str,
        content: Vec<u8>,
        filename: &str,
    ) -> ConsoleResult<UploadedFile>;

    /// Detach a file from the store and remove it from the provider.
    async fn delete_file(&self, store_id: &str, file_id: &str) -> ConsoleResult<()>;

    /// Return the provider name for logs.
    fn provider_name(&self) -> &str;

    /// Find a file by exact filename.
    async fn find_file_by_name(
        &self,
        store_id: &str,
        filename: &str,
    ) -> ConsoleResult<Option<StoredFile>> {
        let files = self.list_files(store_id).await?;
        Ok(files.into_iter().find(|f| f.filename == filename))
    }

    /// Delete several files; each ID ends up in exactly one of `deleted` or `failed`.
    async fn delete_files(
        &self,
        store_id: &str,
        file_ids: &[String],
    ) -> ConsoleResult<DeleteOutcome> {
        let mut outcome = DeleteOutcome::default();
        for file_id in file_ids {
            match self.delete_file(store_id, file_id).await {
                Ok(()) => {
                    info!("Deleted file {file_id} from vector store {store_id}");
                    outcome.deleted.push(file_id.clone());
                }
                Err(e) => {
                    warn!("Failed to delete file {file_id} from vector store {store_id}: {e}");
                    outcome.failed.push(file_id.clone());
                }
            }
        }
        Ok(outcome)
    }
}

/// Trim a requested store name, rejecting blank ones.
pub fn normalize_store_name(name: &str) -> ConsoleResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ConsoleError::validation("Vector store name is required"));
    }
    Ok(name.to_string())
}

/// MIME type sent with an upload, guessed from the filename's extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "csv" => "text/csv",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::memory::MemoryVectorStore;

    #[test]
    fn test_normalize_store_name() {
        assert_eq!(normalize_store_name("  Docs ").unwrap(), "Docs");
        let err = normalize_store_name("   ").unwrap_err();
        assert!(matches!(err, ConsoleError::ValidationFailure(_)));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("Report.PDF"), "application/pdf");
        assert_eq!(content_type_for("notes.md"), "text/markdown");
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_default_delete_files_partitions_ids() {
        let store = MemoryVectorStore::new();
        let vs = store.create_store("Docs").await.unwrap();
        let a = store.upload_and_ingest(&vs.id, b"a".to_vec(), "a.txt").await.unwrap();

        let outcome = store
            .delete_files(&vs.id, &[a.file_id.clone(), "file-missing".to_string()])
            .await
            .unwrap();
        assert_eq!(outcome.deleted, vec![a.file_id]);
        assert_eq!(outcome.failed, vec!["file-missing".to_string()]);
    }
}
