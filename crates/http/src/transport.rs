//! The terminal network call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::request::{OutgoingRequest, Response};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection refused, reset, DNS failure, ...
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    /// The request could not be built; nothing was sent.
    #[error("request could not be built: {0}")]
    Build(String),
}

impl TransportError {
    /// No response was received and sending again may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout)
    }
}

/// Sends one fully prepared request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &OutgoingRequest) -> Result<Response, TransportError>;
}

/// [`Transport`] over a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Client sharing `jar` so the CSRF cookie set by the API is visible to
    /// the pipeline.
    pub fn with_cookie_jar(
        jar: Arc<reqwest::cookie::Jar>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .cookie_provider(jar)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &OutgoingRequest) -> Result<Response, TransportError> {
        let descriptor = request.descriptor();
        let mut builder = self
            .client
            .request(descriptor.method().into(), descriptor.url().clone())
            .headers(request.headers().clone());

        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else if e.is_builder() {
                TransportError::Build(e.to_string())
            } else {
                TransportError::Network(e.to_string())
            }
        })?;

        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Response {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}
