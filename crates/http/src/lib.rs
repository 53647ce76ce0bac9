//! `portalgate-http`: the request pipeline shared by the hub console and
//! the instance portals.
//!
//! Every outgoing API call goes through [`Pipeline::dispatch`]: loading
//! tracking, token injection with refresh, CSRF protection, retry with
//! exponential backoff, and error normalization into
//! [`portalgate_core::AppError`].

pub mod config;
pub mod cookies;
pub mod loading;
pub mod pipeline;
pub mod recovery;
pub mod request;
pub mod retry;
pub mod stages;
pub mod translate;
pub mod transport;

pub use config::{ConfigError, CsrfConfig, InstanceHeader, PipelineConfig, RetryConfig};
pub use cookies::{CookieMap, CookieSource};
pub use loading::{LoadingGuard, LoadingTracker};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use recovery::{NoRecovery, RecoveryHandler};
pub use request::{Method, OutgoingRequest, RequestDescriptor, Response};
pub use retry::{DispatchFailure, RetryDecision, RetryState, backoff_delay, should_retry};
pub use translate::{default_message, translate};
pub use transport::{ReqwestTransport, Transport, TransportError};
