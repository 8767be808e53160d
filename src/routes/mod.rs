pub mod auth;
pub mod dashboard;
pub mod drive;
pub mod health;
pub mod stores;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_support;

use axum::extract::{DefaultBodyLimit, Request};
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use crate::app::AppState;
use crate::ingest::MAX_FILE_BYTES;

/// Room for multipart framing and form fields on top of the file payloads.
const BODY_LIMIT_HEADROOM: usize = 1024 * 1024;

/// Cap for `/upload`: the most files per request, each at the ceiling.
pub const MAX_UPLOAD_BYTES: usize =
    MAX_FILE_BYTES * upload::MAX_FILES_PER_UPLOAD + BODY_LIMIT_HEADROOM;

/// Cap for every other request; none of them carry file content.
const FORM_BODY_LIMIT: usize = 1024 * 1024;

/// Build all console routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let forms = Router::new()
        .merge(auth::routes())
        .merge(dashboard::routes())
        .merge(health::routes())
        .merge(stores::routes())
        .merge(drive::routes())
        .layer(RequestBodyLimitLayer::new(FORM_BODY_LIMIT));
    let uploads = upload::routes().layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES));

    Router::new()
        .merge(forms)
        .merge(uploads)
        // Limits come from the layers above; file sizes are checked per field.
        .layer(DefaultBodyLimit::disable())
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

/// Add the console's security headers to every response.
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'self'"),
    );

    response
}

/// True when the client asked for JSON rather than a page.
pub fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"))
}
