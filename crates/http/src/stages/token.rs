use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderValue};

use portalgate_session::SessionStore;

use crate::request::OutgoingRequest;

/// Attaches `Authorization: Bearer <token>` to API requests.
///
/// A session that cannot produce a token is not an error here: the request
/// goes out without one and the resulting 401 is handled by translation.
#[derive(Debug, Clone)]
pub struct TokenInjector {
    session: SessionStore,
    min_validity: Duration,
    unauthenticated_paths: Vec<String>,
}

impl TokenInjector {
    pub fn new(session: SessionStore, min_validity: Duration, unauthenticated_paths: Vec<String>) -> Self {
        Self {
            session,
            min_validity,
            unauthenticated_paths,
        }
    }

    /// Whether a bearer token belongs on this API request.
    pub fn applies_to(&self, request: &OutgoingRequest) -> bool {
        let path = request.descriptor().url().path();
        !self
            .unauthenticated_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    pub async fn apply(&self, request: &mut OutgoingRequest) {
        if !self.applies_to(request) {
            return;
        }

        match self.session.get_valid_token(self.min_validity).await {
            Ok(token) => match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    request.set_header(AUTHORIZATION, value);
                }
                Err(_) => tracing::warn!("access token is not a valid header value; sending without it"),
            },
            Err(e) => tracing::debug!(error = %e, "no access token; sending unauthenticated"),
        }
    }
}
