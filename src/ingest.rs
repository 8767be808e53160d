use tracing::{info, warn};

use crate::config::Settings;
use crate::error::{ConsoleError, ConsoleResult};
use crate::models::api::IngestResponse;
use crate::vector_store::VectorStoreClient;

/// Largest accepted upload, in bytes (100 MB).
pub const MAX_FILE_BYTES: usize = 100 * 1024 * 1024;

/// Extensions the vector store can embed.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".pdf", ".txt", ".md", ".docx", ".csv", ".json"];

/// Lowercased extension including the dot, or empty when there is none.
pub fn file_extension(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            format!(".{}", ext.to_ascii_lowercase())
        }
        _ => String::new(),
    }
}

pub fn validate_filename(filename: &str) -> ConsoleResult<()> {
    if filename.trim().is_empty() {
        return Err(ConsoleError::validation("No file selected"));
    }
    let ext = file_extension(filename);
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ConsoleError::validation(format!(
            "Unsupported file type for '{filename}'. Allowed: {}",
            SUPPORTED_EXTENSIONS.join(", ")
        )));
    }
    Ok(())
}

pub fn validate_file_size(filename: &str, size: usize) -> ConsoleResult<()> {
    if size == 0 {
        return Err(ConsoleError::validation(format!("File '{filename}' is empty")));
    }
    if size > MAX_FILE_BYTES {
        return Err(ConsoleError::validation(format!(
            "File '{filename}' exceeds the maximum size of {} MB",
            MAX_FILE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Local checks run before any call to the vector store.
pub fn validate_upload(filename: &str, content: &[u8]) -> ConsoleResult<()> {
    validate_filename(filename)?;
    validate_file_size(filename, content.len())
}

/// Pick the store an upload goes to.
///
/// An explicit store wins if it exists, then the configured default, and
/// otherwise a new store is created under the default name.
pub async fn resolve_store(
    client: &dyn VectorStoreClient,
    settings: &Settings,
    requested: Option<&str>,
) -> ConsoleResult<String> {
    let requested = requested.map(str::trim).filter(|id| !id.is_empty());
    let candidates = [requested, settings.default_vector_store_id.as_deref()];

    for store_id in candidates.into_iter().flatten() {
        match client.get_store(store_id).await? {
            Some(store) => return Ok(store.id),
            None => warn!("Vector store {store_id} not found, falling back"),
        }
    }

    let created = client
        .create_store(&settings.default_vector_store_name)
        .await?;
    info!(
        "Created default vector store {} ({})",
        created.id, created.name
    );
    Ok(created.id)
}

/// Validate, replace any same-named file, then upload into the resolved store.
pub async fn ingest_file(
    client: &dyn VectorStoreClient,
    settings: &Settings,
    requested_store: Option<&str>,
    filename: &str,
    content: Vec<u8>,
) -> ConsoleResult<IngestResponse> {
    // 1. Validate locally.
    validate_upload(filename, &content)?;

    // 2. Resolve the target store.
    let store_id = resolve_store(client, settings, requested_store).await?;

    // 3. Drop the stale copy so only one file carries this name.
    let replaced = match client.find_file_by_name(&store_id, filename).await? {
        Some(existing) => {
            client
                .delete_file(&store_id, &existing.id)
                .await
                .map_err(|e| {
                    ConsoleError::external(format!(
                        "Could not replace existing '{filename}': {e}"
                    ))
                })?;
            info!(
                "Removed previous version of {filename} ({}) from {store_id}",
                existing.id
            );
            true
        }
        None => false,
    };

    // 4. Upload and attach.
    let uploaded = client
        .upload_and_ingest(&store_id, content, filename)
        .await?;
    info!(
        "Ingested {filename} as {} into {store_id} via {}",
        uploaded.file_id,
        client.provider_name()
    );

    let file_count = match client.get_store(&store_id).await {
        Ok(Some(store)) => store.file_count,
        Ok(None) => 0,
        Err(e) => {
            warn!("Could not refresh file count for {store_id}: {e}");
            0
        }
    };

    Ok(IngestResponse {
        vector_store_id: store_id,
        file_id: uploaded.file_id,
        filename: filename.to_string(),
        file_count,
        status: uploaded.status,
        replaced,
    })
}
