//! REST error taxonomy and user-facing notices.
//!
//! DESIGN
//! ======
//! Every failed backend call is classified once, by status code, into an
//! [`ApiError`]. The error knows which [`Notice`] the user should see; the
//! request layer decides whether to show it:
//! - `404` on "no data yet" endpoints is an empty state, not an error
//! - static asset failures are logged only
//! - everything else is surfaced through the notifier

use std::fmt;

use serde_json::Value;
use session::{SessionError, StorageError};

use crate::models::ValidationError;

/// Endpoints whose `404` means "nothing saved yet".
const EMPTY_STATE_PATHS: &[&str] = &["/api/users/me/personal-data", "/api/users/me/addresses"];
const EMPTY_STATE_PREFIXES: &[&str] = &["/api/dashboard/"];
const STATIC_ASSET_PREFIX: &str = "/assets/";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No HTTP response: DNS, connect, TLS or timeout failures.
    #[error("network error: {0}")]
    Network(String),
    #[error("validation failed ({status}): {message}")]
    Validation { status: u16, message: String },
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not found: {path}")]
    NotFound { path: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("server error ({status})")]
    Server { status: u16 },
    #[error("unexpected status {status}")]
    Unexpected { status: u16 },
    /// Authentication recovery failed and the session was ended.
    #[error("session expired")]
    SessionExpired,
    #[error("response decode failed: {0}")]
    Decode(String),
    #[error("request encode failed: {0}")]
    Encode(String),
    #[error("http client build failed: {0}")]
    Client(String),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Auth(#[from] SessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// A user-facing message, the terminal counterpart of a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self { severity, message: message.into() }
    }

    #[must_use]
    pub fn session_expired() -> Self {
        Self::new(Severity::Warning, "Your session has expired. Please sign in again.")
    }
}

/// Classify a non-success HTTP response.
#[must_use]
pub fn classify(status: u16, path: &str, body: &str) -> ApiError {
    match status {
        400 | 422 => ApiError::Validation {
            status,
            message: server_message(body).unwrap_or_else(|| "The request is invalid.".to_owned()),
        },
        401 => ApiError::Unauthorized,
        403 => ApiError::Forbidden,
        404 => ApiError::NotFound { path: path.to_owned() },
        409 => ApiError::Conflict(
            server_message(body).unwrap_or_else(|| "The resource was modified or already exists.".to_owned()),
        ),
        500..=599 => ApiError::Server { status },
        _ => ApiError::Unexpected { status },
    }
}

impl ApiError {
    /// HTTP status behind this error, `None` when no response was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Validation { status, .. } | Self::Server { status } | Self::Unexpected { status } => Some(*status),
            Self::Unauthorized | Self::SessionExpired => Some(401),
            Self::Forbidden => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Conflict(_) => Some(409),
            Self::Network(_)
            | Self::Decode(_)
            | Self::Encode(_)
            | Self::Client(_)
            | Self::Invalid(_)
            | Self::Auth(_)
            | Self::Storage(_) => None,
        }
    }

    #[must_use]
    pub fn notice(&self) -> Notice {
        match self {
            Self::Network(_) => Notice::new(Severity::Error, "Could not reach the server. Check your connection."),
            Self::Validation { message, .. } | Self::Conflict(message) => Notice::new(Severity::Warning, message),
            Self::Unauthorized => Notice::new(Severity::Warning, "Authentication failed. Check your credentials."),
            Self::SessionExpired => Notice::session_expired(),
            Self::Forbidden => Notice::new(Severity::Error, "You do not have permission to do that."),
            Self::NotFound { .. } => Notice::new(Severity::Warning, "The requested resource was not found."),
            Self::Server { .. } => Notice::new(Severity::Error, "The server failed to process the request. Try again later."),
            Self::Unexpected { status } => Notice::new(Severity::Error, format!("Unexpected response ({status}).")),
            Self::Decode(_) | Self::Encode(_) | Self::Client(_) => Notice::new(Severity::Error, "Unexpected response from the server."),
            Self::Invalid(e) => Notice::new(Severity::Warning, e.to_string()),
            Self::Auth(e) => Notice::new(Severity::Warning, format!("Sign-in failed: {e}")),
            Self::Storage(_) => Notice::new(Severity::Error, "Could not save local state."),
        }
    }
}

/// `404` on these paths is an empty state and resolves to `None`.
#[must_use]
pub fn is_empty_state(status: u16, path: &str) -> bool {
    status == 404
        && (EMPTY_STATE_PATHS.contains(&path) || EMPTY_STATE_PREFIXES.iter().any(|prefix| path.starts_with(prefix)))
}

#[must_use]
pub fn is_static_asset(path: &str) -> bool {
    path.starts_with(STATIC_ASSET_PREFIX)
}

/// Pull a human-readable message out of an error body. Spring-style
/// `{"message": ...}` first, then `{"error": ...}`, then short plain text.
fn server_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return ["message", "error", "detail"]
            .iter()
            .find_map(|key| value.get(key).and_then(Value::as_str))
            .map(str::to_owned)
            .filter(|m| !m.is_empty());
    }
    (trimmed.len() <= 200 && !trimmed.starts_with('<')).then(|| trimmed.to_owned())
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
