use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;

use crate::app::AppState;
use crate::auth::hash_password;
use crate::config::{resolve_settings, Settings, TomlConfig};
use crate::drive::{check_drive_bytes, DriveClient};
use crate::error::{ConsoleError, ConsoleResult};
use crate::models::store::DriveFile;
use crate::session::{Session, SESSION_COOKIE};
use crate::vector_store::testing::CountingVectorStore;

pub const ADMIN_PASSWORD: &str = "correct-horse-battery";

// Hashing is deliberately slow; share one hash across tests.
static ADMIN_HASH: LazyLock<String> = LazyLock::new(|| hash_password(ADMIN_PASSWORD));

pub fn settings() -> Settings {
    let mut config = TomlConfig::default();
    config.vector_store.provider = "memory".to_string();
    resolve_settings(config, |key| match key {
        "SESSION_SECRET" => Some("router-test-session-secret".to_string()),
        "ADMIN_USERNAME" => Some("admin".to_string()),
        "ADMIN_PASSWORD_HASH" => Some(ADMIN_HASH.clone()),
        _ => None,
    })
    .unwrap()
}

/// Router wired to a call-counting in-memory store.
pub struct TestApp {
    pub state: Arc<AppState>,
    pub store: Arc<CountingVectorStore>,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_drive(None)
    }

    pub fn with_drive(drive: Option<Arc<dyn DriveClient>>) -> Self {
        let store = Arc::new(CountingVectorStore::new());
        let state = Arc::new(AppState::new(settings(), store.clone(), drive));
        let router = super::build_router(state.clone());
        Self {
            state,
            store,
            router,
        }
    }

    /// Cookie header and CSRF token for a logged-in admin.
    pub fn admin(&self) -> (String, String) {
        let session = Session::anonymous(30).login(30);
        let cookie = session.to_cookie(&self.state.settings).unwrap();
        (
            format!("{}={}", SESSION_COOKIE, cookie.value()),
            session.csrf_token().to_string(),
        )
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::ServiceExt;
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn form_post(uri: &str, cookie: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::COOKIE, cookie)
        .header(header::ACCEPT, "application/json")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn json_get(uri: &str, cookie: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::COOKIE, cookie)
        .header(header::ACCEPT, "application/json")
        .body(Body::empty())
        .unwrap()
}

pub const BOUNDARY: &str = "console-test-boundary";

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a [u8]),
}

/// Encode a `multipart/form-data` body; file parts are sent under `file`.
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File(filename, content) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(content);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_post(uri: &str, cookie: &str, parts: &[Part<'_>], json: bool) -> Request<Body> {
    let mut builder = Request::post(uri)
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if json {
        builder = builder.header(header::ACCEPT, "application/json");
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Value of the session cookie set by a response, if any.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| {
            let pair = v.split(';').next()?;
            let (name, value) = pair.split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
        })
}

/// Drive double serving a fixed folder listing.
#[derive(Default)]
pub struct FakeDrive {
    pub files: Vec<DriveFile>,
    pub contents: HashMap<String, Vec<u8>>,
    downloads: AtomicUsize,
}

impl FakeDrive {
    pub fn new(files: Vec<DriveFile>, contents: HashMap<String, Vec<u8>>) -> Self {
        Self {
            files,
            contents,
            downloads: AtomicUsize::new(0),
        }
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DriveClient for FakeDrive {
    async fn list_files(&self, _folder_id: &str) -> ConsoleResult<Vec<DriveFile>> {
        Ok(self.files.clone())
    }

    async fn download_file(&self, file_id: &str, max_bytes: usize) -> ConsoleResult<Vec<u8>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let content = self
            .contents
            .get(file_id)
            .cloned()
            .ok_or_else(|| ConsoleError::external(format!("File not found: {file_id}")))?;
        check_drive_bytes(content.len() as u64, max_bytes)?;
        Ok(content)
    }
}

pub fn drive_file(id: &str, name: &str, size: Option<&str>) -> DriveFile {
    DriveFile {
        id: id.to_string(),
        name: name.to_string(),
        mime_type: "text/plain".to_string(),
        size: size.map(str::to_string),
        modified_time: None,
    }
}
