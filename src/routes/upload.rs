use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::post;
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::{error, info};

use super::{wants_json, MAX_UPLOAD_BYTES};
use crate::app::AppState;
use crate::error::{ConsoleError, ConsoleResult};
use crate::ingest::{ingest_file, validate_file_size, validate_upload, MAX_FILE_BYTES};
use crate::models::api::UploadResponse;
use crate::session::AdminSession;

/// Direct file upload route.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/upload", post(upload))
}

/// Most files accepted by one upload request.
pub const MAX_FILES_PER_UPLOAD: usize = 10;

/// Multipart fields of an upload, fully read before anything is checked.
#[derive(Default)]
struct UploadForm {
    files: Vec<(String, Vec<u8>)>,
    vector_store_id: Option<String>,
    csrf_token: Option<String>,
}

fn read_error(err: MultipartError) -> ConsoleError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ConsoleError::validation(format!(
            "Upload is larger than the {} MB request limit ({MAX_FILES_PER_UPLOAD} files of at most {} MB each)",
            MAX_UPLOAD_BYTES / (1024 * 1024),
            MAX_FILE_BYTES / (1024 * 1024)
        ))
    } else {
        ConsoleError::validation(format!("Failed to read upload: {}", err.body_text()))
    }
}

async fn read_upload_form(mut multipart: Multipart) -> ConsoleResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(read_error)? {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "file" => {
                if form.files.len() == MAX_FILES_PER_UPLOAD {
                    return Err(ConsoleError::validation(format!(
                        "At most {MAX_FILES_PER_UPLOAD} files can be uploaded at once"
                    )));
                }
                let filename = field.file_name().unwrap_or("").to_string();
                let mut content = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(read_error)? {
                    content.extend_from_slice(&chunk);
                    // Stop reading a file as soon as it passes the ceiling.
                    if content.len() > MAX_FILE_BYTES {
                        validate_file_size(&filename, content.len())?;
                    }
                }
                form.files.push((filename, content));
            }
            "vector_store_id" | "csrf_token" => {
                let text = field.text().await.map_err(read_error)?;
                if field_name == "csrf_token" {
                    form.csrf_token = Some(text);
                } else {
                    form.vector_store_id = Some(text);
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

/// POST /upload - Ingest one or more files into the selected store.
///
/// Browsers without JavaScript get a redirect back to the dashboard with a
/// flash message; clients that accept JSON get the ingest results.
async fn upload(
    State(state): State<Arc<AppState>>,
    AdminSession(mut session): AdminSession,
    jar: CookieJar,
    headers: HeaderMap,
    multipart: Multipart,
) -> ConsoleResult<Response> {
    let json = wants_json(&headers);
    let result = ingest_upload(&state, &session, multipart).await;

    if json {
        return Ok(Json(result?).into_response());
    }

    match result {
        Ok(response) => session.flash(response.message, "success"),
        // Auth-level failures are not turned into flashes.
        Err(err @ ConsoleError::CsrfFailure(_)) => return Err(err),
        Err(err) => session.flash(err.to_string(), "error"),
    }
    let jar = session.store(jar, &state.settings)?;
    Ok((jar, Redirect::to("/admin")).into_response())
}

async fn ingest_upload(
    state: &AppState,
    session: &crate::session::Session,
    multipart: Multipart,
) -> ConsoleResult<UploadResponse> {
    let form = read_upload_form(multipart).await?;

    // 1. Local checks on every file before any external call.
    session.validate_csrf(form.csrf_token.as_deref())?;
    if form.files.is_empty() {
        return Err(ConsoleError::validation("No file selected"));
    }
    for (filename, content) in &form.files {
        validate_upload(filename, content)?;
    }

    // 2. Ingest one by one.
    let total = form.files.len();
    let mut results = Vec::with_capacity(total);
    for (filename, content) in form.files {
        match ingest_file(
            state.vector_store.as_ref(),
            &state.settings,
            form.vector_store_id.as_deref(),
            &filename,
            content,
        )
        .await
        {
            Ok(result) => results.push(result),
            Err(e) if results.is_empty() => return Err(e),
            Err(e) => {
                let done: Vec<&str> = results.iter().map(|r| r.filename.as_str()).collect();
                error!(
                    "Upload of {filename} failed after {} of {total} file(s) were ingested: {e}",
                    done.len()
                );
                return Err(e.with_detail(format!(
                    "{} of {total} file(s) were already ingested: {}",
                    done.len(),
                    done.join(", ")
                )));
            }
        }
    }

    info!("Ingested {} uploaded file(s)", results.len());
    let message = if total == 1 {
        "File ingested successfully!".to_string()
    } else {
        format!("{total} files ingested successfully!")
    };
    Ok(UploadResponse {
        success: true,
        message,
        files: results,
    })
}
