use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::post;
use axum::{Form, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::info;

use super::wants_json;
use crate::app::AppState;
use crate::drive::{extract_folder_id, validate_drive_file_size};
use crate::error::{ConsoleError, ConsoleResult};
use crate::ingest::{ingest_file, validate_filename, MAX_FILE_BYTES};
use crate::models::api::{DriveIngestForm, DriveIngestResponse, DriveListForm, DriveListResponse};
use crate::session::AdminSession;

/// Google Drive import routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/google-drive/list", post(list_folder))
        .route("/google-drive/ingest", post(ingest_drive_file))
}

/// POST /google-drive/list - List importable files in a folder.
async fn list_folder(
    State(state): State<Arc<AppState>>,
    AdminSession(session): AdminSession,
    Form(form): Form<DriveListForm>,
) -> ConsoleResult<Json<DriveListResponse>> {
    session.validate_csrf(form.csrf_token.as_deref())?;
    let drive = state.drive()?;

    let folder_id = extract_folder_id(&form.folder_link)
        .ok_or_else(|| ConsoleError::validation("Invalid Google Drive folder link"))?;

    let files = drive.list_files(&folder_id).await?;
    for file in &files {
        validate_drive_file_size(file.size.as_deref(), MAX_FILE_BYTES)
            .map_err(|e| ConsoleError::validation(format!("{}: {e}", file.name)))?;
    }

    Ok(Json(DriveListResponse { folder_id, files }))
}

/// POST /google-drive/ingest - Download one drive file and ingest it.
async fn ingest_drive_file(
    State(state): State<Arc<AppState>>,
    AdminSession(mut session): AdminSession,
    jar: CookieJar,
    headers: HeaderMap,
    Form(form): Form<DriveIngestForm>,
) -> ConsoleResult<Response> {
    session.validate_csrf(form.csrf_token.as_deref())?;
    let drive = state.drive()?;

    let file_id = form.file_id.trim();
    if file_id.is_empty() {
        return Err(ConsoleError::validation("Missing Google Drive file ID"));
    }
    // Skip the download for file types that would be rejected anyway.
    validate_filename(&form.file_name)?;

    let content = drive.download_file(file_id, MAX_FILE_BYTES).await?;

    let result = ingest_file(
        state.vector_store.as_ref(),
        &state.settings,
        form.vector_store_id.as_deref(),
        &form.file_name,
        content,
    )
    .await?;

    let message = format!("Imported {} from Google Drive", form.file_name);
    info!("{message} into {}", result.vector_store_id);

    if wants_json(&headers) {
        return Ok(Json(DriveIngestResponse {
            success: true,
            message,
            result,
        })
        .into_response());
    }

    session.flash(message, "success");
    let jar = session.store(jar, &state.settings)?;
    Ok((jar, Redirect::to("/admin")).into_response())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::http::StatusCode;

    use crate::drive::DriveClient;
    use crate::routes::test_support::{body_json, drive_file, form_post, FakeDrive, TestApp};
    use crate::vector_store::VectorStoreClient;

    fn app_with(drive: FakeDrive) -> (TestApp, Arc<FakeDrive>) {
        let drive = Arc::new(drive);
        let client: Arc<dyn DriveClient> = drive.clone();
        (TestApp::with_drive(Some(client)), drive)
    }

    #[tokio::test]
    async fn test_drive_not_configured_is_503() {
        let app = TestApp::new();
        let (cookie, csrf) = app.admin();
        let resp = app
            .send(form_post(
                "/google-drive/list",
                &cookie,
                &format!("folder_link=1AbCdEfGhIjK&csrf_token={csrf}"),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(resp).await["error"], "not_configured");
    }

    #[tokio::test]
    async fn test_list_folder() {
        let (app, _) = app_with(FakeDrive::new(
            vec![drive_file("d1", "faq.txt", Some("12")), drive_file("d2", "Doc", None)],
            HashMap::new(),
        ));
        let (cookie, csrf) = app.admin();
        let link = "https%3A%2F%2Fdrive.google.com%2Fdrive%2Ffolders%2F1AbCdEfGhIjK%3Fusp%3Dsharing";
        let resp = app
            .send(form_post(
                "/google-drive/list",
                &cookie,
                &format!("folder_link={link}&csrf_token={csrf}"),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["folder_id"], "1AbCdEfGhIjK");
        assert_eq!(json["files"][0]["mimeType"], "text/plain");
        assert_eq!(json["files"][0]["size"], "12");
        assert!(json["files"][1].get("size").is_none());
    }

    #[tokio::test]
    async fn test_list_rejects_bad_link_and_oversized_entries() {
        let (app, _) = app_with(FakeDrive::new(
            vec![drive_file("d1", "huge.pdf", Some("209715200"))],
            HashMap::new(),
        ));
        let (cookie, csrf) = app.admin();

        let resp = app
            .send(form_post(
                "/google-drive/list",
                &cookie,
                &format!("folder_link=nope&csrf_token={csrf}"),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["detail"], "Invalid Google Drive folder link");

        let resp = app
            .send(form_post(
                "/google-drive/list",
                &cookie,
                &format!("folder_link=1AbCdEfGhIjK&csrf_token={csrf}"),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let detail = body_json(resp).await["detail"].as_str().unwrap().to_string();
        assert!(detail.starts_with("huge.pdf: File is too large"));
    }

    #[tokio::test]
    async fn test_ingest_drive_file() {
        let mut contents = HashMap::new();
        contents.insert("d1".to_string(), b"Q: why?\nA: because.".to_vec());
        let (app, drive) = app_with(FakeDrive::new(
            vec![drive_file("d1", "faq.txt", Some("20"))],
            contents,
        ));
        let store = app.store.create_store("Docs").await.unwrap();
        let (cookie, csrf) = app.admin();

        let body = format!(
            "file_id=d1&file_name=faq.txt&vector_store_id={}&csrf_token={csrf}",
            store.id
        );
        let resp = app.send(form_post("/google-drive/ingest", &cookie, &body)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Imported faq.txt from Google Drive");
        assert_eq!(json["vector_store_id"], store.id.as_str());
        assert_eq!(json["file_count"], 1);
        assert_eq!(drive.downloads(), 1);

        let files = app.store.list_files(&store.id).await.unwrap();
        assert_eq!(files[0].filename, "faq.txt");
    }

    #[tokio::test]
    async fn test_ingest_unsupported_type_skips_download() {
        let (app, drive) = app_with(FakeDrive::default());
        let (cookie, csrf) = app.admin();
        let resp = app
            .send(form_post(
                "/google-drive/ingest",
                &cookie,
                &format!("file_id=d1&file_name=Budget&csrf_token={csrf}"),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(drive.downloads(), 0);
        assert_eq!(app.store.calls(), 0);
    }

    #[tokio::test]
    async fn test_ingest_requires_csrf() {
        let (app, drive) = app_with(FakeDrive::default());
        let (cookie, _) = app.admin();
        let resp = app
            .send(form_post(
                "/google-drive/ingest",
                &cookie,
                "file_id=d1&file_name=faq.txt",
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(drive.downloads(), 0);
    }
}
