use reqwest::header::{HeaderName, HeaderValue};

use crate::config::ResolvedConfig;
use crate::request::OutgoingRequest;

/// Instance identifier and correlation id, attached unconditionally to API
/// requests.
#[derive(Debug, Clone)]
pub struct ScopeHeaders {
    instance: Option<(HeaderName, HeaderValue)>,
    request_id: Option<HeaderName>,
}

impl ScopeHeaders {
    pub fn new(config: &ResolvedConfig) -> Self {
        Self {
            instance: config.instance_header.clone(),
            request_id: config.request_id_header.clone(),
        }
    }

    pub fn apply(&self, request: &mut OutgoingRequest) {
        if let Some((name, value)) = &self.instance {
            request.set_header(name.clone(), value.clone());
        }
        if let Some(name) = &self.request_id {
            // UUIDs are always valid header values.
            if let Ok(value) = HeaderValue::from_str(&request.id().to_string()) {
                request.set_header(name.clone(), value);
            }
        }
    }
}
