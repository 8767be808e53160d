use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::convert::Infallible;
use std::sync::Arc;

use crate::app::AppState;
use crate::auth::{
    decode_session, encode_session, generate_csrf_token, validate_csrf_token, AdminCredentials,
    Flash, SessionClaims,
};
use crate::config::Settings;
use crate::error::{ConsoleError, ConsoleResult};

pub const SESSION_COOKIE: &str = "admin_session";

/// The browser's session, decoded from the signed cookie on every request.
///
/// A request without a valid cookie gets a fresh anonymous session that only
/// carries a CSRF token; it is persisted once a handler writes it back with
/// [`Session::store`].
#[derive(Debug, Clone)]
pub struct Session {
    claims: SessionClaims,
}

impl Session {
    /// Start an anonymous session valid for `ttl_minutes`.
    pub fn anonymous(ttl_minutes: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            claims: SessionClaims {
                auth: false,
                iat: now,
                exp: now + ttl_minutes * 60,
                csrf: generate_csrf_token(),
                flash: None,
            },
        }
    }

    /// Restore a session from a cookie value, if it verifies.
    pub fn from_token(token: &str, secret: &str) -> Option<Self> {
        decode_session(token, secret).map(|claims| Self { claims })
    }

    /// Read the session cookie from a jar, falling back to a new anonymous session.
    pub fn from_jar(jar: &CookieJar, settings: &Settings) -> Self {
        jar.get(SESSION_COOKIE)
            .and_then(|cookie| Self::from_token(cookie.value(), &settings.session_secret))
            .unwrap_or_else(|| Self::anonymous(settings.session_ttl_minutes))
    }

    pub fn is_authenticated(&self) -> bool {
        self.claims.auth
    }

    pub fn csrf_token(&self) -> &str {
        &self.claims.csrf
    }

    pub fn issued_at(&self) -> i64 {
        self.claims.iat
    }

    pub fn expires_at(&self) -> i64 {
        self.claims.exp
    }

    pub fn require_authenticated(&self) -> ConsoleResult<()> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(ConsoleError::Unauthenticated)
        }
    }

    /// Compare a submitted form token against this session's token.
    pub fn validate_csrf(&self, form_token: Option<&str>) -> ConsoleResult<()> {
        validate_csrf_token(Some(&self.claims.csrf), form_token)
    }

    /// Upgrade to an authenticated session with a fresh CSRF token and expiry.
    pub fn login(self, ttl_minutes: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            claims: SessionClaims {
                auth: true,
                iat: now,
                exp: now + ttl_minutes * 60,
                csrf: generate_csrf_token(),
                flash: self.claims.flash,
            },
        }
    }

    pub fn flash(&mut self, message: impl Into<String>, category: impl Into<String>) {
        self.claims.flash = Some(Flash {
            message: message.into(),
            category: category.into(),
        });
    }

    /// Remove and return the pending flash message.
    pub fn take_flash(&mut self) -> Option<Flash> {
        self.claims.flash.take()
    }

    /// Sign the session into a cookie.
    pub fn to_cookie(&self, settings: &Settings) -> ConsoleResult<Cookie<'static>> {
        let token = encode_session(&self.claims, &settings.session_secret).map_err(|e| {
            tracing::error!("Failed to sign session: {e}");
            ConsoleError::external("Failed to sign session")
        })?;
        Ok(Cookie::build((SESSION_COOKIE, token))
            .http_only(true)
            .secure(settings.secure_cookies)
            .same_site(SameSite::Lax)
            .path("/")
            .build())
    }

    /// Write the session back into the jar.
    pub fn store(&self, jar: CookieJar, settings: &Settings) -> ConsoleResult<CookieJar> {
        Ok(jar.add(self.to_cookie(settings)?))
    }
}

/// Check credentials and, on success, return a logged-in session.
pub fn authenticate(
    credentials: &AdminCredentials,
    current: Session,
    username: &str,
    password: &str,
    ttl_minutes: i64,
) -> ConsoleResult<Session> {
    credentials.check(username, password)?;
    Ok(current.login(ttl_minutes))
}

/// Drop the session cookie.
pub fn clear(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

impl FromRequestParts<Arc<AppState>> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(Session::from_jar(&jar, &state.settings))
    }
}

/// A session that must belong to the logged-in admin; rejects with 401 otherwise.
#[derive(Debug, Clone)]
pub struct AdminSession(pub Session);

impl FromRequestParts<Arc<AppState>> for AdminSession {
    type Rejection = ConsoleError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let session = Session::from_jar(&jar, &state.settings);
        session.require_authenticated()?;
        Ok(AdminSession(session))
    }
}
