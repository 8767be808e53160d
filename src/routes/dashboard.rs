use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::warn;

use crate::app::AppState;
use crate::console::render::{render_dashboard, DashboardPage};
use crate::console::{reduce, DashboardEvent, DashboardState, StatusKind, StatusMessage};
use crate::error::ConsoleResult;
use crate::session::Session;

const CONSOLE_JS: &str = include_str!("../../assets/console.js");
const CONSOLE_CSS: &str = include_str!("../../assets/console.css");

/// Dashboard page and its static assets.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(dashboard))
        .route("/admin", get(dashboard))
        .route("/static/console.js", get(console_js))
        .route("/static/console.css", get(console_css))
}

/// Load stores and the selected store's files into a fresh dashboard model.
async fn initial_state(state: &AppState) -> DashboardState {
    let mut model = DashboardState::default();

    match state.vector_store.list_stores().await {
        Ok(stores) => model = reduce(DashboardEvent::StoresLoaded(stores), model),
        Err(e) => {
            warn!("Could not load vector stores: {e}");
            return reduce(DashboardEvent::Failed(e.to_string()), model);
        }
    }

    if let Some(default_id) = state.settings.default_vector_store_id.as_deref() {
        if model.stores.iter().any(|s| s.id == default_id) {
            model = reduce(DashboardEvent::StoreSelected(default_id.to_string()), model);
        }
    }

    if let Some(store_id) = model.selected_store.clone() {
        match state.vector_store.list_files(&store_id).await {
            Ok(files) => model = reduce(DashboardEvent::FilesLoaded { store_id, files }, model),
            Err(e) => {
                warn!("Could not load files for {store_id}: {e}");
                model = reduce(DashboardEvent::Failed(e.to_string()), model);
            }
        }
    }
    model
}

/// GET / and /admin - The dashboard, or a redirect to the login page.
async fn dashboard(
    State(state): State<Arc<AppState>>,
    mut session: Session,
    jar: CookieJar,
) -> ConsoleResult<Response> {
    if !session.is_authenticated() {
        return Ok(Redirect::to("/login").into_response());
    }

    let mut model = initial_state(&state).await;
    let flash = session.take_flash();
    if let Some(flash) = &flash {
        model.status = Some(StatusMessage {
            kind: StatusKind::from_category(&flash.category),
            text: flash.message.clone(),
        });
    }

    let html = render_dashboard(&DashboardPage {
        app_name: &state.settings.app_name,
        csrf_token: session.csrf_token(),
        drive_enabled: state.drive.is_some(),
        state: &model,
    });

    // Only rewrite the cookie when the flash was consumed.
    if flash.is_some() {
        let jar = session.store(jar, &state.settings)?;
        return Ok((jar, Html(html)).into_response());
    }
    Ok(Html(html).into_response())
}

async fn console_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        CONSOLE_JS,
    )
}

async fn console_css() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], CONSOLE_CSS)
}
