use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::{content_type_for, normalize_store_name, VectorStoreClient};
use crate::config::Settings;
use crate::error::{provider_error, ConsoleError, ConsoleResult};
use crate::models::store::{StoredFile, UploadedFile, VectorStoreSummary};

const PAGE_LIMIT: usize = 100;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const SKIPPED_FILE_STATUSES: &[&str] = &["deleted", "not_found"];

/// OpenAI vector stores via the REST API (assistants v2).
pub struct OpenAIVectorStoreClient {
    api_base: String,
    api_key: String,
    http_client: reqwest::Client,
    ingest_timeout: Duration,
    poll_interval: Duration,
}

#[derive(Deserialize)]
struct ListPage<T> {
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    last_id: Option<String>,
}

trait Listed {
    fn id(&self) -> &str;
}

#[derive(Deserialize)]
struct FileCounts {
    #[serde(default)]
    total: u64,
}

#[derive(Deserialize)]
struct VectorStoreObject {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    file_counts: Option<FileCounts>,
    #[serde(default)]
    created_at: Option<i64>,
}

impl Listed for VectorStoreObject {
    fn id(&self) -> &str {
        &self.id
    }
}

impl From<VectorStoreObject> for VectorStoreSummary {
    fn from(obj: VectorStoreObject) -> Self {
        Self {
            name: obj.name.unwrap_or_else(|| obj.id.clone()),
            file_count: obj.file_counts.map(|c| c.total).unwrap_or(0),
            created_at: obj.created_at,
            id: obj.id,
        }
    }
}

#[derive(Deserialize)]
struct LastError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct VectorStoreFileObject {
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    created_at: Option<i64>,
    #[serde(default)]
    last_error: Option<LastError>,
}

impl Listed for VectorStoreFileObject {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Deserialize)]
struct FileObject {
    id: String,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    bytes: Option<u64>,
    #[serde(default)]
    created_at: Option<i64>,
}

#[derive(Serialize)]
struct CreateStoreRequest<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct AttachFileRequest<'a> {
    file_id: &'a str,
}

impl OpenAIVectorStoreClient {
    pub fn new(api_base: &str, api_key: &str, ingest_timeout: Duration) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http_client: reqwest::Client::new(),
            ingest_timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings
            .openai_api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY required for the openai provider"))?;
        Ok(Self::new(
            &settings.openai_api_base,
            api_key,
            Duration::from_secs(settings.ingest_timeout_secs),
        ))
    }

    /// Override how often processing status is polled after attaching a file.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}{}", self.api_base, path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn send(&self, request: RequestBuilder) -> ConsoleResult<Response> {
        let resp = request.send().await.map_err(|e| {
            error!("OpenAI request failed: {e}");
            ConsoleError::from(e)
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!("OpenAI API error ({status}): {body}");
            return Err(provider_error("OpenAI", status, &body));
        }
        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ConsoleResult<T> {
        let resp = self.send(request).await?;
        resp.json::<T>().await.map_err(|e| {
            error!("Unexpected OpenAI response: {e}");
            ConsoleError::external(format!("Unexpected OpenAI response: {e}"))
        })
    }

    /// Follow cursor pagination until the provider reports no more pages.
    async fn list_all<T: DeserializeOwned + Listed>(&self, path: &str) -> ConsoleResult<Vec<T>> {
        let mut items = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut request = self
                .request(Method::GET, path)
                .query(&[("limit", PAGE_LIMIT.to_string())]);
            if let Some(cursor) = &after {
                request = request.query(&[("after", cursor)]);
            }

            let page: ListPage<T> = self.send_json(request).await?;
            let cursor = page
                .last_id
                .or_else(|| page.data.last().map(|item| item.id().to_string()));
            let fetched = page.data.len();
            items.extend(page.data);

            match cursor {
                Some(cursor) if page.has_more && fetched > 0 => after = Some(cursor),
                _ => break,
            }
        }
        Ok(items)
    }

    async fn retrieve_file(&self, file_id: &str) -> ConsoleResult<FileObject> {
        self.send_json(self.request(Method::GET, &format!("/files/{file_id}")))
            .await
    }

    async fn upload_to_files(&self, content: Vec<u8>, filename: &str) -> ConsoleResult<FileObject> {
        let part = reqwest::multipart::Part::bytes(content)
            .file_name(filename.to_string())
            .mime_str(content_type_for(filename))?;
        let form = reqwest::multipart::Form::new()
            .text("purpose", "assistants")
            .part("file", part);

        self.send_json(self.request(Method::POST, "/files").multipart(form))
            .await
    }

    async fn remove_from_files(&self, file_id: &str) -> ConsoleResult<()> {
        self.send(self.request(Method::DELETE, &format!("/files/{file_id}")))
            .await?;
        Ok(())
    }

    /// Poll an attached file until it leaves `in_progress`.
    async fn wait_for_processing(
        &self,
        store_id: &str,
        file_id: &str,
    ) -> ConsoleResult<VectorStoreFileObject> {
        let path = format!("/vector_stores/{store_id}/files/{file_id}");
        loop {
            let file: VectorStoreFileObject =
                self.send_json(self.request(Method::GET, &path)).await?;
            if file.status.as_deref() != Some("in_progress") {
                return Ok(file);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl VectorStoreClient for OpenAIVectorStoreClient {
    async fn list_stores(&self) -> ConsoleResult<Vec<VectorStoreSummary>> {
        let stores: Vec<VectorStoreObject> = self.list_all("/vector_stores").await?;
        Ok(stores.into_iter().map(VectorStoreSummary::from).collect())
    }

    async fn create_store(&self, name: &str) -> ConsoleResult<VectorStoreSummary> {
        let name = normalize_store_name(name)?;
        let created: VectorStoreObject = self
            .send_json(
                self.request(Method::POST, "/vector_stores")
                    .json(&CreateStoreRequest { name: &name }),
            )
            .await?;
        info!("Created vector store {} ({name})", created.id);
        Ok(created.into())
    }

    async fn get_store(&self, store_id: &str) -> ConsoleResult<Option<VectorStoreSummary>> {
        let resp = self
            .request(Method::GET, &format!("/vector_stores/{store_id}"))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!("OpenAI API error ({status}): {body}");
            return Err(provider_error("OpenAI", status, &body));
        }
        let store: VectorStoreObject = resp
            .json()
            .await
            .map_err(|e| ConsoleError::external(format!("Unexpected OpenAI response: {e}")))?;
        Ok(Some(store.into()))
    }

    async fn list_files(&self, store_id: &str) -> ConsoleResult<Vec<StoredFile>> {
        let entries: Vec<VectorStoreFileObject> = self
            .list_all(&format!("/vector_stores/{store_id}/files"))
            .await?;

        let mut files = Vec::with_capacity(entries.len());
        for entry in entries {
            let status = entry.status.unwrap_or_else(|| "unknown".to_string());
            if SKIPPED_FILE_STATUSES.contains(&status.as_str()) {
                continue;
            }
            let details = match self.retrieve_file(&entry.id).await {
                Ok(details) => details,
                Err(e) => {
                    warn!("Skipping file {} in vector store {store_id}: {e}", entry.id);
                    continue;
                }
            };
            files.push(StoredFile {
                filename: details.filename.unwrap_or_else(|| entry.id.clone()),
                bytes: details.bytes.unwrap_or(0),
                created_at: details.created_at.or(entry.created_at),
                status,
                id: entry.id,
            });
        }

        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(files)
    }

    async fn upload_and_ingest(
        &self,
        store_id: &str,
        content: Vec<u8>,
        filename: &str,
    ) -> ConsoleResult<UploadedFile> {
        // 1. Upload to the Files API.
        let uploaded = self.upload_to_files(content, filename).await?;
        let file_id = uploaded.id;
        info!("Uploaded {filename} as {file_id}");

        // 2. Attach to the vector store.
        let attach = self
            .send_json::<VectorStoreFileObject>(
                self.request(Method::POST, &format!("/vector_stores/{store_id}/files"))
                    .json(&AttachFileRequest { file_id: &file_id }),
            )
            .await;
        let attached = match attach {
            Ok(attached) => attached,
            Err(e) => {
                if let Err(cleanup) = self.remove_from_files(&file_id).await {
                    warn!("Failed to remove orphaned file {file_id}: {cleanup}");
                }
                return Err(e);
            }
        };

        // 3. Wait for embedding to finish.
        let processed = if attached.status.as_deref() == Some("in_progress") {
            tokio::time::timeout(
                self.ingest_timeout,
                self.wait_for_processing(store_id, &file_id),
            )
            .await
            .map_err(|_| {
                warn!("Timed out waiting for {file_id} in vector store {store_id}");
                ConsoleError::Timeout(
                    "File upload timed out. The file may still be processing. \
                     Please check the vector store status."
                        .to_string(),
                )
            })??
        } else {
            attached
        };

        // Anything but `completed` (failed, cancelled, unknown) is not searchable.
        let status = processed.status.unwrap_or_else(|| "completed".to_string());
        if status != "completed" {
            let reason = processed
                .last_error
                .and_then(|e| e.message)
                .unwrap_or_else(|| "no reason given".to_string());
            error!("Processing of {file_id} ended as {status}: {reason}");
            return Err(ConsoleError::external(format!(
                "File processing {status}: {reason}"
            )));
        }

        Ok(UploadedFile { file_id, status })
    }

    async fn delete_file(&self, store_id: &str, file_id: &str) -> ConsoleResult<()> {
        let detached = self
            .send(self.request(
                Method::DELETE,
                &format!("/vector_stores/{store_id}/files/{file_id}"),
            ))
            .await;
        let removed = self.remove_from_files(file_id).await;

        match (detached, removed) {
            (Ok(_), Ok(())) => Ok(()),
            (Err(e), _) | (_, Err(e)) => Err(e),
        }
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}
