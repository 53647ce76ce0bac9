use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};

use portalgate_auth::{Permission, Principal, Role, TokenClaims};

use crate::TokenSet;

/// Current authentication state.
///
/// Created on login, replaced by the refresh flow, dropped on logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: DateTime<Utc>,
    provider_session_expires_at: Option<DateTime<Utc>>,
    subject: String,
    roles: HashSet<Role>,
    permissions: Vec<Permission>,
}

impl Session {
    /// Build a session from a token set, reading grants from the access
    /// token's claims.
    ///
    /// Opaque (non-JWT) access tokens yield a session with no grants.
    pub fn from_tokens(tokens: TokenSet) -> Self {
        let (subject, roles, permissions) = match TokenClaims::from_jwt(&tokens.access_token) {
            Ok(claims) => (
                claims.sub,
                claims.roles.into_iter().collect(),
                claims.permissions,
            ),
            Err(e) => {
                tracing::debug!(error = %e, "access token claims unreadable; session has no grants");
                (String::new(), HashSet::new(), Vec::new())
            }
        };

        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: tokens.expires_at,
            provider_session_expires_at: tokens.provider_session_expires_at,
            subject,
            roles,
            permissions,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn roles(&self) -> &HashSet<Role> {
        &self.roles
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    /// Remaining lifetime of the access token; zero once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether the provider-side session can still issue tokens silently.
    pub fn provider_session_live(&self, now: DateTime<Utc>) -> bool {
        self.refresh_token.is_some() && self.provider_session_expires_at.is_none_or(|exp| exp > now)
    }

    pub fn principal(&self) -> Principal {
        Principal::authenticated(
            self.subject.clone(),
            self.roles.iter().cloned(),
            self.permissions.iter().cloned(),
        )
    }
}
