use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Permission, Role};

/// Access-token claims as consumed by the portals.
///
/// Signature verification is the identity provider's concern; by the time a
/// token reaches the client it is trusted, and only its payload is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject / principal identifier.
    pub sub: String,

    /// Roles granted to the principal.
    pub roles: Vec<Role>,

    /// Raw permission strings (`module:action`, `module:*`, `*`).
    pub permissions: Vec<Permission>,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimsDecodeError {
    #[error("token is not a three-part JWT")]
    Malformed,

    #[error("token payload is not valid base64url: {0}")]
    Base64(String),

    #[error("token payload is not valid claims JSON: {0}")]
    Json(String),

    #[error("token timestamp out of range: {0}")]
    Timestamp(i64),
}

#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    sub: String,
    exp: i64,
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    roles: Option<Vec<String>>,
    #[serde(default)]
    realm_access: Option<RealmAccess>,
    #[serde(default)]
    permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RealmAccess {
    #[serde(default)]
    roles: Vec<String>,
}

impl TokenClaims {
    /// Decode the payload segment of a compact JWT.
    ///
    /// Roles are read from a top-level `roles` claim, falling back to
    /// `realm_access.roles`. A missing `iat` decodes as the Unix epoch.
    pub fn from_jwt(token: &str) -> Result<Self, ClaimsDecodeError> {
        let mut parts = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ClaimsDecodeError::Malformed);
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| ClaimsDecodeError::Base64(e.to_string()))?;

        let raw: RawClaims =
            serde_json::from_slice(&bytes).map_err(|e| ClaimsDecodeError::Json(e.to_string()))?;

        let roles = raw
            .roles
            .or_else(|| raw.realm_access.map(|r| r.roles))
            .unwrap_or_default();

        Ok(Self {
            sub: raw.sub,
            roles: roles.into_iter().map(Role::from).collect(),
            permissions: raw.permissions.into_iter().map(Permission::from).collect(),
            issued_at: timestamp(raw.iat.unwrap_or(0))?,
            expires_at: timestamp(raw.exp)?,
        })
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, ClaimsDecodeError> {
    DateTime::from_timestamp(secs, 0).ok_or(ClaimsDecodeError::Timestamp(secs))
}

/// Deterministically validate the claims' time window.
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
