//! Pipeline configuration.
//!
//! One parameterised core serves both deployments (the hub console and the
//! per-country instance portals); the presets below capture their
//! differences.

use reqwest::Url;
use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid api_base_url '{0}': {1}")]
    InvalidBaseUrl(String, String),

    #[error("invalid header name '{0}'")]
    InvalidHeaderName(String),

    #[error("invalid header value for '{0}'")]
    InvalidHeaderValue(String),

    #[error("retry.base_delay_ms must be greater than zero")]
    ZeroBaseDelay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Base URL of the REST API. Requests on this origin under this path are
    /// "API requests"; everything else is third-party.
    pub api_base_url: String,

    /// Minimum remaining token lifetime before a refresh is forced.
    #[serde(default = "default_token_min_validity_ms")]
    pub token_min_validity_ms: u64,

    /// Path prefixes on the API origin that never carry a bearer token
    /// (e.g. identity provider endpoints proxied through the API host).
    #[serde(default)]
    pub unauthenticated_paths: Vec<String>,

    #[serde(default)]
    pub csrf: CsrfConfig,

    /// Tenant/instance identifier attached to every API request.
    #[serde(default)]
    pub instance_header: Option<InstanceHeader>,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Header carrying the per-dispatch correlation id.
    #[serde(default = "default_request_id_header")]
    pub request_id_header: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrfConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_csrf_cookie")]
    pub cookie_name: String,
    #[serde(default = "default_csrf_header")]
    pub header_name: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cookie_name: default_csrf_cookie(),
            header_name: default_csrf_header(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Path substrings that are never retried.
    #[serde(default = "default_excluded_paths")]
    pub excluded_paths: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            excluded_paths: default_excluded_paths(),
        }
    }
}

fn default_token_min_validity_ms() -> u64 {
    30_000
}

fn default_request_id_header() -> Option<String> {
    Some("X-Request-Id".to_string())
}

fn default_csrf_cookie() -> String {
    "XSRF-TOKEN".to_string()
}

fn default_csrf_header() -> String {
    "X-XSRF-TOKEN".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_excluded_paths() -> Vec<String> {
    ["/auth/login", "/auth/logout", "/payments/initiate", "/submit", "/complete"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl PipelineConfig {
    /// Configuration with defaults for everything but the API location.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            token_min_validity_ms: default_token_min_validity_ms(),
            unauthenticated_paths: Vec::new(),
            csrf: CsrfConfig::default(),
            instance_header: None,
            retry: RetryConfig::default(),
            request_id_header: default_request_id_header(),
        }
    }

    /// Hub console: no CSRF cookie, no instance scoping.
    pub fn hub(api_base_url: impl Into<String>) -> Self {
        Self::new(api_base_url)
    }

    /// Per-country instance portal: CSRF-protected and scoped by instance code.
    pub fn instance(api_base_url: impl Into<String>, instance_code: impl Into<String>) -> Self {
        Self {
            csrf: CsrfConfig {
                enabled: true,
                ..CsrfConfig::default()
            },
            instance_header: Some(InstanceHeader {
                name: "X-Instance-Id".to_string(),
                value: instance_code.into(),
            }),
            ..Self::new(api_base_url)
        }
    }

    /// Parse names, values and URLs once, up front.
    pub fn validate(&self) -> Result<ResolvedConfig, ConfigError> {
        let mut base = Url::parse(&self.api_base_url)
            .map_err(|e| ConfigError::InvalidBaseUrl(self.api_base_url.clone(), e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ConfigError::InvalidBaseUrl(
                self.api_base_url.clone(),
                "not a base URL".to_string(),
            ));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        if self.retry.base_delay_ms == 0 {
            return Err(ConfigError::ZeroBaseDelay);
        }

        let instance_header = self
            .instance_header
            .as_ref()
            .map(|h| {
                let value = HeaderValue::from_str(&h.value)
                    .map_err(|_| ConfigError::InvalidHeaderValue(h.name.clone()))?;
                Ok::<_, ConfigError>((header_name(&h.name)?, value))
            })
            .transpose()?;

        Ok(ResolvedConfig {
            api_base: base,
            csrf_header: header_name(&self.csrf.header_name)?,
            instance_header,
            request_id_header: self.request_id_header.as_deref().map(header_name).transpose()?,
        })
    }
}

fn header_name(name: &str) -> Result<HeaderName, ConfigError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| ConfigError::InvalidHeaderName(name.to_string()))
}

/// Parsed, ready-to-use parts of a [`PipelineConfig`].
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_base: Url,
    pub csrf_header: HeaderName,
    pub instance_header: Option<(HeaderName, HeaderValue)>,
    pub request_id_header: Option<HeaderName>,
}

impl ResolvedConfig {
    /// Same origin as the API and under its base path.
    pub fn is_api_request(&self, url: &Url) -> bool {
        url.origin() == self.api_base.origin() && url.path().starts_with(self.api_base.path())
    }
}
