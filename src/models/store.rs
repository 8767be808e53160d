use serde::{Deserialize, Serialize};

/// A vector store as shown in the console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorStoreSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub file_count: u64,
    /// Unix timestamp reported by the provider.
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// A file attached to exactly one vector store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<i64>,
}

fn default_status() -> String {
    "unknown".to_string()
}

/// Per-file result of a batch delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

/// Result of uploading one file into a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_id: String,
    pub status: String,
}

/// A file listed from a drive folder. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    /// Drive reports sizes as decimal strings; folders and native docs have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(rename = "modifiedTime", default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
}
