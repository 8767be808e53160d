use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::info;

use super::wants_json;
use crate::app::AppState;
use crate::error::ConsoleResult;
use crate::models::api::{CreateStoreForm, DeleteFilesForm, FileListResponse, StoreListResponse};
use crate::models::store::VectorStoreSummary;
use crate::session::AdminSession;

/// Vector store management API.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/vector-stores", get(list_stores))
        .route("/api/vector-stores/create", post(create_store))
        .route("/api/vector-stores/{id}/files", get(list_files))
        .route("/api/vector-stores/{id}/files/delete", post(delete_files))
}

/// GET /api/vector-stores
async fn list_stores(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
) -> ConsoleResult<Json<StoreListResponse>> {
    let stores = state.vector_store.list_stores().await?;
    Ok(Json(StoreListResponse { stores }))
}

/// POST /api/vector-stores/create
async fn create_store(
    State(state): State<Arc<AppState>>,
    AdminSession(session): AdminSession,
    Form(form): Form<CreateStoreForm>,
) -> ConsoleResult<Json<VectorStoreSummary>> {
    session.validate_csrf(form.csrf_token.as_deref())?;
    let store = state.vector_store.create_store(&form.name).await?;
    info!("Vector store {} created from console", store.id);
    Ok(Json(store))
}

/// GET /api/vector-stores/{id}/files
async fn list_files(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Path(store_id): Path<String>,
) -> ConsoleResult<Json<FileListResponse>> {
    let files = state.vector_store.list_files(&store_id).await?;
    Ok(Json(FileListResponse {
        vector_store_id: store_id,
        files,
    }))
}

/// POST /api/vector-stores/{id}/files/delete
///
/// `file_ids` may repeat, so this uses the `axum_extra` form extractor.
/// A plain form post from the dashboard is answered with a flash and a
/// redirect; JSON clients get the outcome.
async fn delete_files(
    State(state): State<Arc<AppState>>,
    AdminSession(mut session): AdminSession,
    jar: CookieJar,
    headers: HeaderMap,
    Path(store_id): Path<String>,
    axum_extra::extract::Form(form): axum_extra::extract::Form<DeleteFilesForm>,
) -> ConsoleResult<Response> {
    session.validate_csrf(form.csrf_token.as_deref())?;

    let outcome = state
        .vector_store
        .delete_files(&store_id, &form.file_ids)
        .await?;
    info!(
        "Deleted {} file(s) from {store_id}, {} failed",
        outcome.deleted.len(),
        outcome.failed.len()
    );

    if wants_json(&headers) {
        return Ok(Json(outcome).into_response());
    }

    if outcome.failed.is_empty() {
        session.flash(format!("Deleted {} file(s)", outcome.deleted.len()), "success");
    } else {
        session.flash(
            format!(
                "Deleted {} file(s); could not delete: {}",
                outcome.deleted.len(),
                outcome.failed.join(", ")
            ),
            "error",
        );
    }
    let jar = session.store(jar, &state.settings)?;
    Ok((jar, Redirect::to("/admin")).into_response())
}
