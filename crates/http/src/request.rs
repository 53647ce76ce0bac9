//! Request and response shapes flowing through the pipeline.

use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use portalgate_core::{AppError, RequestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Options,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Anything but GET, HEAD and OPTIONS.
    pub fn is_state_changing(self) -> bool {
        !matches!(self, Self::Get | Self::Head | Self::Options)
    }

    /// Repeating the call has the same effect as performing it once.
    ///
    /// Create (POST) and partial-update (PATCH) verbs are not.
    pub fn is_idempotent(self) -> bool {
        !matches!(self, Self::Post | Self::Patch)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl core::fmt::Display for Method {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(value: Method) -> Self {
        match value {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Options => reqwest::Method::OPTIONS,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// What is being called, classified once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    url: Url,
    method: Method,
    is_state_changing: bool,
    is_excluded_from_retry: bool,
}

impl RequestDescriptor {
    /// Classify a request against the retry denylist (path substrings).
    pub fn new(method: Method, url: Url, excluded_paths: &[String]) -> Self {
        let path = url.path();
        let denylisted = excluded_paths
            .iter()
            .any(|p| !p.is_empty() && path.contains(p.as_str()));

        Self {
            is_state_changing: method.is_state_changing(),
            is_excluded_from_retry: denylisted || !method.is_idempotent(),
            url,
            method,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn is_state_changing(&self) -> bool {
        self.is_state_changing
    }

    pub fn is_excluded_from_retry(&self) -> bool {
        self.is_excluded_from_retry
    }
}

/// A request as the stages build it up before it reaches the transport.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    id: RequestId,
    descriptor: RequestDescriptor,
    headers: HeaderMap,
    body: Option<serde_json::Value>,
}

impl OutgoingRequest {
    pub fn new(descriptor: RequestDescriptor, body: Option<serde_json::Value>) -> Self {
        Self {
            id: RequestId::new(),
            descriptor,
            headers: HeaderMap::new(),
            body,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }
}

/// A response received from the server, any status.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// 1xx-3xx.
    pub fn is_success(&self) -> bool {
        self.status < 400
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| AppError::client("INVALID_RESPONSE_BODY", e.to_string()))
    }
}
