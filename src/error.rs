use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Fallback shown to the operator when a provider gives no usable detail.
pub const GENERIC_FAILURE: &str = "The request to the external service failed.";

/// Errors surfaced by the console to the operator.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("Invalid username or password")]
    AuthenticationFailure,
    #[error("Authentication required")]
    Unauthenticated,
    #[error("{0}")]
    CsrfFailure(String),
    #[error("{0}")]
    ValidationFailure(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    ExternalServiceFailure(String),
    #[error("{0}")]
    NotConfiguredFailure(String),
    #[error("{0}")]
    Timeout(String),
}

impl ConsoleError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationFailure(msg.into())
    }

    /// Wrap a provider message, falling back to a generic one when it is blank.
    pub fn external(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        if msg.trim().is_empty() {
            Self::ExternalServiceFailure(GENERIC_FAILURE.to_string())
        } else {
            Self::ExternalServiceFailure(msg)
        }
    }

    /// Append context to the operator-facing message, keeping the kind.
    pub fn with_detail(self, extra: impl std::fmt::Display) -> Self {
        match self {
            Self::CsrfFailure(m) => Self::CsrfFailure(format!("{m} ({extra})")),
            Self::ValidationFailure(m) => Self::ValidationFailure(format!("{m} ({extra})")),
            Self::NotFound(m) => Self::NotFound(format!("{m} ({extra})")),
            Self::ExternalServiceFailure(m) => {
                Self::ExternalServiceFailure(format!("{m} ({extra})"))
            }
            Self::NotConfiguredFailure(m) => Self::NotConfiguredFailure(format!("{m} ({extra})")),
            Self::Timeout(m) => Self::Timeout(format!("{m} ({extra})")),
            other @ (Self::AuthenticationFailure | Self::Unauthenticated) => other,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationFailure | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::CsrfFailure(_) | Self::ValidationFailure(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ExternalServiceFailure(_) => StatusCode::BAD_GATEWAY,
            Self::NotConfiguredFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Machine-readable kind, mirrored in the JSON body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthenticationFailure => "authentication_failure",
            Self::Unauthenticated => "unauthenticated",
            Self::CsrfFailure(_) => "csrf_failure",
            Self::ValidationFailure(_) => "validation_failure",
            Self::NotFound(_) => "not_found",
            Self::ExternalServiceFailure(_) => "external_service_failure",
            Self::NotConfiguredFailure(_) => "not_configured",
            Self::Timeout(_) => "timeout",
        }
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(format!("External service timed out: {err}"))
        } else {
            Self::external(err.to_string())
        }
    }
}

/// Build an external failure from a provider's non-success response.
///
/// OpenAI and Google both answer `{"error": {"message": "..."}}`; anything
/// else falls back to the status line and raw body.
pub fn provider_error(provider: &str, status: reqwest::StatusCode, body: &str) -> ConsoleError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(|m| m.as_str())
                .map(|m| m.to_string())
        })
        .filter(|m| !m.trim().is_empty());

    match message {
        Some(message) => ConsoleError::external(format!("{provider} error ({status}): {message}")),
        None if body.trim().is_empty() => ConsoleError::external(format!("{provider} error ({status})")),
        None => ConsoleError::external(format!("{provider} error ({status}): {}", body.trim())),
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub detail: String,
}

impl IntoResponse for ConsoleError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind(),
            detail: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

pub type ConsoleResult<T> = Result<T, ConsoleError>;
