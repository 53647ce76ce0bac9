use portalgate_core::AppError;
use thiserror::Error;

/// Failures reported by the identity provider seam.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("identity provider rejected the request: {0}")]
    Rejected(String),

    #[error("identity provider unreachable: {0}")]
    Unreachable(String),

    #[error("operation not supported by this identity provider")]
    Unsupported,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No session exists (before login or after logout).
    #[error("not authenticated")]
    NotAuthenticated,

    /// The session could not be refreshed and has been cleared.
    #[error("session expired")]
    Expired,

    /// A provider call outside the refresh flow failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Provider(e) => AppError::client("IDENTITY_PROVIDER", e.to_string()),
            other => AppError::session_expired(other.to_string()),
        }
    }
}
