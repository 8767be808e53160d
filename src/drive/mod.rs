pub mod google;

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::error::{ConsoleError, ConsoleResult};
use crate::models::store::DriveFile;

/// Read-only access to a cloud drive folder.
#[async_trait]
pub trait DriveClient: Send + Sync {
    /// List the non-trashed files directly inside a folder (first page only).
    async fn list_files(&self, folder_id: &str) -> ConsoleResult<Vec<DriveFile>>;

    /// Download a file's raw bytes, giving up once it passes `max_bytes`.
    async fn download_file(&self, file_id: &str, max_bytes: usize) -> ConsoleResult<Vec<u8>>;
}

static FOLDER_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-A-Za-z0-9_]{10,}").unwrap());

/// Pull a folder ID out of a bare ID or a Drive folder URL.
pub fn extract_folder_id(link: &str) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }
    FOLDER_ID_REGEX
        .find(link)
        .map(|m| m.as_str().to_string())
}

/// Reject drive files over `max_bytes`. Missing or non-numeric sizes pass.
pub fn validate_drive_file_size(size: Option<&str>, max_bytes: usize) -> ConsoleResult<()> {
    match size.and_then(|s| s.trim().parse::<u64>().ok()) {
        Some(bytes) => check_drive_bytes(bytes, max_bytes),
        None => Ok(()),
    }
}

/// Reject a known byte count over `max_bytes`.
pub fn check_drive_bytes(bytes: u64, max_bytes: usize) -> ConsoleResult<()> {
    if bytes > max_bytes as u64 {
        return Err(ConsoleError::validation(format!(
            "File is too large ({:.1} MB). Maximum size is {} MB",
            bytes as f64 / (1024.0 * 1024.0),
            max_bytes / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Error returned by drive routes when no service account is configured.
pub fn not_configured() -> ConsoleError {
    ConsoleError::NotConfiguredFailure(
        "Google Drive integration is not configured".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_folder_id_from_url() {
        let url = "https://drive.google.com/drive/folders/1AbCdEfGhIjKlMnOp?usp=sharing";
        assert_eq!(extract_folder_id(url).as_deref(), Some("1AbCdEfGhIjKlMnOp"));

        let nested = "https://drive.google.com/drive/u/0/folders/0B_xyz-1234567890";
        assert_eq!(extract_folder_id(nested).as_deref(), Some("0B_xyz-1234567890"));
    }

    #[test]
    fn test_extract_folder_id_bare_and_blank() {
        assert_eq!(
            extract_folder_id("  1AbCdEfGhIjK  ").as_deref(),
            Some("1AbCdEfGhIjK")
        );
        assert_eq!(extract_folder_id(""), None);
        assert_eq!(extract_folder_id("   "), None);
        assert_eq!(extract_folder_id("short"), None);
    }

    #[test]
    fn test_validate_drive_file_size() {
        let max = 100 * 1024 * 1024;
        assert!(validate_drive_file_size(None, max).is_ok());
        assert!(validate_drive_file_size(Some("not-a-number"), max).is_ok());
        assert!(validate_drive_file_size(Some("104857600"), max).is_ok());

        let err = validate_drive_file_size(Some("104857601"), max).unwrap_err();
        assert!(matches!(err, ConsoleError::ValidationFailure(_)));
        assert!(err.to_string().contains("Maximum size is 100 MB"));
    }

    #[test]
    fn test_check_drive_bytes() {
        assert!(check_drive_bytes(1024, 1024).is_ok());
        let err = check_drive_bytes(3 * 1024 * 1024, 1024 * 1024).unwrap_err();
        assert_eq!(err.to_string(), "File is too large (3.0 MB). Maximum size is 1 MB");
    }

    #[test]
    fn test_not_configured_is_503() {
        assert_eq!(
            not_configured().status_code(),
            axum::http::StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
