use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::{check_drive_bytes, DriveClient};
use crate::config::Settings;
use crate::error::{provider_error, ConsoleError, ConsoleResult};
use crate::models::store::DriveFile;

const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const LIST_FIELDS: &str = "files(id,name,mimeType,size,modifiedTime)";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the provider's expiry.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// The parts of a service-account key file the client needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<&'a str>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Deserialize)]
struct FileListResponse {
    #[serde(default)]
    files: Vec<DriveFile>,
}

struct CachedToken {
    access_token: String,
    expires_at: i64,
}

/// Google Drive v3 client authenticated as a service account.
pub struct GoogleDriveClient {
    api_base: String,
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    impersonated_user: Option<String>,
    http_client: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleDriveClient {
    pub fn new(
        api_base: &str,
        key: ServiceAccountKey,
        impersonated_user: Option<String>,
    ) -> anyhow::Result<Self> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid service account private key: {e}"))?;
        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            key,
            signing_key,
            impersonated_user,
            http_client: reqwest::Client::new(),
            token: Mutex::new(None),
        })
    }

    /// Build the client when a service-account file is configured.
    ///
    /// Returns `Ok(None)` when drive features are off. A configured file that
    /// cannot be read or parsed is a startup error.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Option<Self>> {
        let Some(path) = settings.google_service_account_file.as_ref() else {
            return Ok(None);
        };
        let raw = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Cannot read service account file {}: {e}", path.display())
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Invalid service account file {}: {e}", path.display()))?;

        info!(
            "Google Drive enabled for {} (impersonating: {})",
            key.client_email,
            settings.google_impersonated_user.as_deref().unwrap_or("none")
        );
        let client = Self::new(
            &settings.drive_api_base,
            key,
            settings.google_impersonated_user.clone(),
        )?;
        Ok(Some(client))
    }

    fn assertion_claims(&self, now: i64) -> AssertionClaims<'_> {
        AssertionClaims {
            iss: &self.key.client_email,
            scope: DRIVE_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
            sub: self.impersonated_user.as_deref(),
        }
    }

    async fn check(&self, resp: Response, provider: &str) -> ConsoleResult<Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        error!("{provider} error ({status}): {body}");
        Err(provider_error(provider, status, &body))
    }

    /// Return a cached access token, exchanging a fresh assertion when needed.
    async fn access_token(&self) -> ConsoleResult<String> {
        let mut cached = self.token.lock().await;
        let now = chrono::Utc::now().timestamp();
        if let Some(token) = cached.as_ref() {
            if token.expires_at - TOKEN_REFRESH_MARGIN_SECS > now {
                return Ok(token.access_token.clone());
            }
        }

        let assertion = encode(
            &Header::new(Algorithm::RS256),
            &self.assertion_claims(now),
            &self.signing_key,
        )
        .map_err(|e| {
            error!("Failed to sign service account assertion: {e}");
            ConsoleError::external("Failed to sign Google service account assertion")
        })?;

        let resp = self
            .http_client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let resp = self.check(resp, "Google OAuth").await?;
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| ConsoleError::external(format!("Unexpected Google OAuth response: {e}")))?;

        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: now + token.expires_in,
        });
        Ok(token.access_token)
    }

    async fn get(&self, path: &str) -> ConsoleResult<RequestBuilder> {
        let token = self.access_token().await?;
        Ok(self
            .http_client
            .get(format!("{}{}", self.api_base, path))
            .bearer_auth(token))
    }
}

#[async_trait]
impl DriveClient for GoogleDriveClient {
    async fn list_files(&self, folder_id: &str) -> ConsoleResult<Vec<DriveFile>> {
        let query = format!("'{folder_id}' in parents and trashed = false");
        let resp = self
            .get("/files")
            .await?
            .query(&[
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", "1000"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await?;
        let resp = self.check(resp, "Google Drive").await?;
        let listing: FileListResponse = resp
            .json()
            .await
            .map_err(|e| ConsoleError::external(format!("Unexpected Google Drive response: {e}")))?;

        info!("Listed {} files in drive folder {folder_id}", listing.files.len());
        Ok(listing.files)
    }

    async fn download_file(&self, file_id: &str, max_bytes: usize) -> ConsoleResult<Vec<u8>> {
        let resp = self
            .get(&format!("/files/{file_id}"))
            .await?
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .send()
            .await?;
        let mut resp = self.check(resp, "Google Drive").await?;
        if let Some(length) = resp.content_length() {
            check_drive_bytes(length, max_bytes)?;
        }

        let mut content = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            content.extend_from_slice(&chunk);
            if content.len() > max_bytes {
                warn!("Drive file {file_id} passed {max_bytes} bytes, download aborted");
                return Err(ConsoleError::validation(format!(
                    "File is too large. Maximum size is {} MB",
                    max_bytes / (1024 * 1024)
                )));
            }
        }
        info!("Downloaded drive file {file_id} ({} bytes)", content.len());
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_KEY: &str = include_str!("../../testdata/drive-test-key.pem");

    fn key(server: &MockServer) -> ServiceAccountKey {
        ServiceAccountKey {
            client_email: "importer@project.iam.gserviceaccount.com".to_string(),
            private_key: TEST_KEY.to_string(),
            token_uri: format!("{}/token", server.uri()),
        }
    }

    async fn mount_token(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains(
                "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.test-token",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[test]
    fn test_service_account_key_defaults_token_uri() {
        let key: ServiceAccountKey = serde_json::from_str(
            r#"{"type": "service_account", "client_email": "a@b.iam.gserviceaccount.com", "private_key": "pem"}"#,
        )
        .unwrap();
        assert_eq!(key.token_uri, "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn test_invalid_private_key_rejected() {
        let key = ServiceAccountKey {
            client_email: "a@b".to_string(),
            private_key: "not a pem".to_string(),
            token_uri: default_token_uri(),
        };
        assert!(GoogleDriveClient::new("http://localhost", key, None).is_err());
    }

    #[tokio::test]
    async fn test_assertion_claims_include_subject_when_impersonating() {
        let server = MockServer::start().await;
        let client = GoogleDriveClient::new(
            &server.uri(),
            key(&server),
            Some("ops@example.com".to_string()),
        )
        .unwrap();

        let claims = serde_json::to_value(client.assertion_claims(1_700_000_000)).unwrap();
        assert_eq!(claims["iss"], "importer@project.iam.gserviceaccount.com");
        assert_eq!(claims["scope"], DRIVE_SCOPE);
        assert_eq!(claims["sub"], "ops@example.com");
        assert_eq!(claims["exp"], 1_700_003_600);

        let plain = GoogleDriveClient::new(&server.uri(), key(&server), None).unwrap();
        let claims = serde_json::to_value(plain.assertion_claims(0)).unwrap();
        assert!(claims.get("sub").is_none());
    }

    #[tokio::test]
    async fn test_list_files_queries_folder_and_caches_token() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .and(header("authorization", "Bearer ya29.test-token"))
            .and(query_param("q", "'folder1234567' in parents and trashed = false"))
            .and(query_param("pageSize", "1000"))
            .and(query_param("supportsAllDrives", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": [
                    {"id": "f1", "name": "guide.pdf", "mimeType": "application/pdf", "size": "1024"},
                    {"id": "f2", "name": "Sheet", "mimeType": "application/vnd.google-apps.spreadsheet"}
                ]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = GoogleDriveClient::new(&server.uri(), key(&server), None).unwrap();
        let files = client.list_files("folder1234567").await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].size.as_deref(), Some("1024"));
        assert!(files[1].size.is_none());

        // Second call reuses the cached token.
        client.list_files("folder1234567").await.unwrap();
    }

    #[tokio::test]
    async fn test_download_file() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/files/f1"))
            .and(query_param("alt", "media"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
            .mount(&server)
            .await;

        let client = GoogleDriveClient::new(&server.uri(), key(&server), None).unwrap();
        let bytes = client.download_file("f1", 1024).await.unwrap();
        assert_eq!(bytes, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_download_over_limit_is_rejected() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/files/huge"))
            .and(query_param("alt", "media"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 3 * 1024 * 1024]))
            .mount(&server)
            .await;

        let client = GoogleDriveClient::new(&server.uri(), key(&server), None).unwrap();
        let err = client.download_file("huge", 1024 * 1024).await.unwrap_err();
        assert!(matches!(err, ConsoleError::ValidationFailure(_)));
        assert!(err.to_string().contains("Maximum size is 1 MB"));
    }

    #[tokio::test]
    async fn test_drive_error_surfaces_message() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": 404, "message": "File not found: folder1234567."}
            })))
            .mount(&server)
            .await;

        let client = GoogleDriveClient::new(&server.uri(), key(&server), None).unwrap();
        let err = client.list_files("folder1234567").await.unwrap_err();
        assert!(matches!(err, ConsoleError::ExternalServiceFailure(_)));
        assert!(err.to_string().contains("File not found: folder1234567."));
    }

    #[tokio::test]
    async fn test_rejected_grant_is_external_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid JWT Signature."
            })))
            .mount(&server)
            .await;

        let client = GoogleDriveClient::new(&server.uri(), key(&server), None).unwrap();
        let err = client.download_file("f1", 1024).await.unwrap_err();
        assert!(matches!(err, ConsoleError::ExternalServiceFailure(_)));
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[test]
    fn test_from_settings_reads_key_file() {
        use crate::config::{resolve_settings, TomlConfig};
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        let body = json!({
            "type": "service_account",
            "client_email": "importer@project.iam.gserviceaccount.com",
            "private_key": TEST_KEY,
        });
        file.write_all(body.to_string().as_bytes()).unwrap();
        let path = file.path().to_string_lossy().to_string();

        let settings = resolve_settings(TomlConfig::default(), |name| match name {
            "SESSION_SECRET" => Some("drive-test-secret-123".to_string()),
            "GOOGLE_SERVICE_ACCOUNT_FILE" => Some(path.clone()),
            _ => None,
        })
        .unwrap();
        assert!(GoogleDriveClient::from_settings(&settings).unwrap().is_some());

        let disabled = resolve_settings(TomlConfig::default(), |name| match name {
            "SESSION_SECRET" => Some("drive-test-secret-123".to_string()),
            _ => None,
        })
        .unwrap();
        assert!(GoogleDriveClient::from_settings(&disabled).unwrap().is_none());
    }
}
