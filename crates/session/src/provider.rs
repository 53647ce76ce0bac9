//! Seam to the external identity provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::ProviderError;

/// Tokens handed out by the identity provider on login or refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Expiry of `access_token`.
    pub expires_at: DateTime<Utc>,
    /// Expiry of the provider-side session (refresh token lifetime), when known.
    pub provider_session_expires_at: Option<DateTime<Utc>>,
}

/// The identity provider's client-side contract.
///
/// Only token refresh, silent re-login, login initiation and logout are
/// consumed; the provider's own protocol stays behind this trait.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange a refresh token for a fresh token set.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, ProviderError>;

    /// Obtain tokens without user interaction from a live provider session.
    async fn silent_login(&self) -> Result<TokenSet, ProviderError>;

    /// Start an interactive login that returns the user to `return_to`.
    async fn login(&self, return_to: &str) -> Result<(), ProviderError>;

    /// End the provider session.
    async fn logout(&self) -> Result<(), ProviderError>;
}

/// Provider for pre-issued tokens that cannot be refreshed.
///
/// Used by tooling that receives a bearer token out of band.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticProvider;

#[async_trait]
impl IdentityProvider for StaticProvider {
    async fn refresh(&self, _refresh_token: &str) -> Result<TokenSet, ProviderError> {
        Err(ProviderError::Unsupported)
    }

    async fn silent_login(&self) -> Result<TokenSet, ProviderError> {
        Err(ProviderError::Unsupported)
    }

    async fn login(&self, return_to: &str) -> Result<(), ProviderError> {
        tracing::info!(return_to, "interactive login requested; supply a new token out of band");
        Ok(())
    }

    async fn logout(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
