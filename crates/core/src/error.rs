//! Error model shared by the pipeline and its callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of the pure building blocks in this crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl CoreError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

/// Coarse classification of a surfaced failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed request or local failure before dispatch.
    Client,
    /// No response was received.
    Transport,
    /// The server answered with a 4xx/5xx status.
    Server,
    /// The session could not be refreshed.
    SessionExpired,
}

/// Normalized application error.
///
/// The only failure shape callers of the pipeline ever observe. Immutable once
/// constructed: fields are private and exposed through accessors.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
#[error("{code} ({status}): {message}")]
pub struct AppError {
    status: u16,
    code: String,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    kind: ErrorKind,
    timestamp: DateTime<Utc>,
}

impl AppError {
    /// Error for a received 4xx/5xx response.
    pub fn server(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::build(ErrorKind::Server, status, code.into(), message.into())
    }

    /// Error for a request that never got a response (status 0).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::build(ErrorKind::Transport, 0, Self::status_code(0), message.into())
    }

    /// Error for a request that could not be built or sent locally.
    pub fn client(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::build(ErrorKind::Client, 0, code.into(), message.into())
    }

    /// Error for a session that could not be refreshed.
    pub fn session_expired(message: impl Into<String>) -> Self {
        Self::build(ErrorKind::SessionExpired, 401, "SESSION_EXPIRED".to_string(), message.into())
    }

    /// Attach server-provided details. Only meaningful while building.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Fallback application code for a status: `HTTP_<status>`.
    pub fn status_code(status: u16) -> String {
        format!("HTTP_{status}")
    }

    fn build(kind: ErrorKind, status: u16, code: String, message: String) -> Self {
        Self {
            status,
            code,
            message,
            details: None,
            kind,
            timestamp: Utc::now(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&serde_json::Value> {
        self.details.as_ref()
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_use_status_zero() {
        let err = AppError::transport("connection refused");
        assert_eq!(err.status(), 0);
        assert_eq!(err.code(), "HTTP_0");
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn server_error_display_and_details() {
        let err = AppError::server(409, "DUPLICATE_DECLARATION", "already submitted")
            .with_details(serde_json::json!({"field": "reference"}));

        assert_eq!(err.to_string(), "DUPLICATE_DECLARATION (409): already submitted");
        assert_eq!(err.details().unwrap()["field"], "reference");
        assert_eq!(err.kind(), ErrorKind::Server);
    }

    #[test]
    fn serializes_without_empty_details() {
        let err = AppError::server(404, AppError::status_code(404), "not found");
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["code"], "HTTP_404");
        assert_eq!(json["kind"], "server");
        assert!(json.get("details").is_none());
    }
}
