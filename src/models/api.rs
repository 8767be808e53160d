use serde::{Deserialize, Serialize};

use super::store::{DriveFile, StoredFile, VectorStoreSummary};

// ──────────────────────────── Auth ────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub csrf_token: Option<String>,
}

/// Body of mutating forms that carry nothing but the CSRF token.
#[derive(Debug, Deserialize)]
pub struct CsrfForm {
    #[serde(default)]
    pub csrf_token: Option<String>,
}

// ──────────────────────────── Vector stores ────────────────────────────

#[derive(Debug, Serialize)]
pub struct StoreListResponse {
    pub stores: Vec<VectorStoreSummary>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStoreForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub csrf_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub vector_store_id: String,
    pub files: Vec<StoredFile>,
}

/// Repeated `file_ids` keys are collected, with or without the `[]` suffix.
#[derive(Debug, Deserialize)]
pub struct DeleteFilesForm {
    #[serde(default)]
    pub csrf_token: Option<String>,
    #[serde(default, alias = "file_ids[]")]
    pub file_ids: Vec<String>,
}

// ──────────────────────────── Ingest ────────────────────────────

/// Outcome of ingesting a single file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub vector_store_id: String,
    pub file_id: String,
    pub filename: String,
    pub file_count: u64,
    pub status: String,
    /// True when an older file with the same name was removed first.
    pub replaced: bool,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub files: Vec<IngestResponse>,
}

// ──────────────────────────── Drive ────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DriveListForm {
    #[serde(default)]
    pub folder_link: String,
    #[serde(default)]
    pub csrf_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DriveListResponse {
    pub folder_id: String,
    pub files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
pub struct DriveIngestForm {
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub vector_store_id: Option<String>,
    #[serde(default)]
    pub csrf_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DriveIngestResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub result: IngestResponse,
}

// ──────────────────────────── Health ────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
