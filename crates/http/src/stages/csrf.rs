use std::sync::Arc;

use reqwest::header::{HeaderName, HeaderValue};

use crate::cookies::CookieSource;
use crate::request::OutgoingRequest;

/// Copies the CSRF cookie into a header on state-changing API requests.
///
/// A missing cookie is not an error; the request proceeds unmodified.
#[derive(Clone)]
pub struct CsrfAttacher {
    enabled: bool,
    cookie_name: String,
    header_name: HeaderName,
    cookies: Arc<dyn CookieSource>,
}

impl CsrfAttacher {
    pub fn new(
        enabled: bool,
        cookie_name: String,
        header_name: HeaderName,
        cookies: Arc<dyn CookieSource>,
    ) -> Self {
        Self {
            enabled,
            cookie_name,
            header_name,
            cookies,
        }
    }

    pub fn apply(&self, request: &mut OutgoingRequest) {
        if !self.enabled || !request.descriptor().is_state_changing() {
            return;
        }

        let Some(token) = self.cookies.cookie(request.descriptor().url(), &self.cookie_name) else {
            tracing::debug!(cookie = %self.cookie_name, "CSRF cookie absent; request left unmodified");
            return;
        };

        match HeaderValue::from_str(&token) {
            Ok(value) => request.set_header(self.header_name.clone(), value),
            Err(_) => tracing::warn!(cookie = %self.cookie_name, "CSRF cookie is not a valid header value"),
        }
    }
}

impl core::fmt::Debug for CsrfAttacher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CsrfAttacher")
            .field("enabled", &self.enabled)
            .field("cookie_name", &self.cookie_name)
            .field("header_name", &self.header_name)
            .finish()
    }
}
