use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::{info, warn};

use super::wants_json;
use crate::app::AppState;
use crate::console::render::render_login;
use crate::console::{StatusKind, StatusMessage};
use crate::error::ConsoleResult;
use crate::models::api::{CsrfForm, LoginForm};
use crate::session::{authenticate, Session};

/// Login and logout routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/logout", post(logout))
}

/// GET /login - Render the login form with a fresh anonymous session.
async fn login_page(
    State(state): State<Arc<AppState>>,
    mut session: Session,
    jar: CookieJar,
) -> ConsoleResult<Response> {
    if session.is_authenticated() {
        return Ok(Redirect::to("/admin").into_response());
    }

    let status = session.take_flash().map(|flash| StatusMessage {
        kind: StatusKind::from_category(&flash.category),
        text: flash.message,
    });
    let html = render_login(
        &state.settings.app_name,
        session.csrf_token(),
        None,
        status.as_ref(),
    );
    let jar = session.store(jar, &state.settings)?;
    Ok((jar, Html(html)).into_response())
}

/// POST /login - Check credentials and upgrade the session.
async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    jar: CookieJar,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> ConsoleResult<Response> {
    session.validate_csrf(form.csrf_token.as_deref())?;

    let csrf_token = session.csrf_token().to_string();
    let ttl = state.settings.session_ttl_minutes;
    match authenticate(&state.credentials, session, &form.username, &form.password, ttl) {
        Ok(mut session) => {
            info!("Admin logged in");
            session.flash("Welcome back!", "success");
            let jar = session.store(jar, &state.settings)?;
            Ok((jar, Redirect::to("/admin")).into_response())
        }
        Err(err) => {
            warn!("Failed login attempt");
            if wants_json(&headers) {
                return Ok(err.into_response());
            }
            let html = render_login(
                &state.settings.app_name,
                &csrf_token,
                Some(&err.to_string()),
                None,
            );
            Ok((StatusCode::UNAUTHORIZED, Html(html)).into_response())
        }
    }
}

/// POST /logout - Drop authentication and return to the login page.
async fn logout(
    State(state): State<Arc<AppState>>,
    session: Session,
    jar: CookieJar,
    Form(form): Form<CsrfForm>,
) -> ConsoleResult<Response> {
    session.validate_csrf(form.csrf_token.as_deref())?;

    let mut signed_out = Session::anonymous(state.settings.session_ttl_minutes);
    signed_out.flash("You have been signed out.", "info");
    let jar = signed_out.store(jar, &state.settings)?;
    info!("Admin logged out");
    Ok((jar, Redirect::to("/login")).into_response())
}
