//! Retry/backoff engine.
//!
//! [`should_retry`] is a pure decision; [`send_with_retry`] drives the
//! transport with it.

use std::time::Duration;

use crate::config::RetryConfig;
use crate::request::{OutgoingRequest, RequestDescriptor, Response};
use crate::transport::{Transport, TransportError};

/// A failed attempt, before translation.
#[derive(Debug, Clone)]
pub enum DispatchFailure {
    /// No response was received.
    Transport(TransportError),
    /// The server answered with a 4xx/5xx status.
    Status(Response),
}

impl DispatchFailure {
    /// Status of the failure; 0 when no response was received.
    pub fn status(&self) -> u16 {
        match self {
            Self::Transport(_) => 0,
            Self::Status(resp) => resp.status,
        }
    }

    /// Transport failures, 408, 429 and 5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_transient(),
            Self::Status(resp) => is_retryable_status(resp.status),
        }
    }
}

pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 0 | 408 | 429 | 500..=599)
}

/// Per-dispatch retry bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// 1-indexed number of the retry being considered.
    pub attempt: u32,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl RetryState {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            attempt: 1,
            max_attempts: config.max_attempts,
            base_delay_ms: config.base_delay_ms,
        }
    }

    pub fn advance(&mut self) {
        self.attempt = self.attempt.saturating_add(1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

/// `base * 2^(attempt - 1)`, saturating.
pub fn backoff_delay(base_delay_ms: u64, attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(base_delay_ms.saturating_mul(factor))
}

/// Decide whether a failed attempt is retried.
pub fn should_retry(
    descriptor: &RequestDescriptor,
    failure: &DispatchFailure,
    state: &RetryState,
) -> RetryDecision {
    if descriptor.is_excluded_from_retry() || !descriptor.method().is_idempotent() {
        return RetryDecision::GiveUp;
    }
    if !failure.is_retryable() {
        return RetryDecision::GiveUp;
    }
    if state.attempt > state.max_attempts {
        return RetryDecision::GiveUp;
    }
    RetryDecision::RetryAfter(backoff_delay(state.base_delay_ms, state.attempt))
}

/// Send `request`, retrying per `config`. The last failure is returned
/// unchanged once retries stop.
///
/// Dropping the returned future abandons any pending backoff timer.
pub async fn send_with_retry(
    transport: &dyn Transport,
    request: &OutgoingRequest,
    config: &RetryConfig,
) -> Result<Response, DispatchFailure> {
    let mut state = RetryState::new(config);

    loop {
        let failure = match transport.send(request).await {
            Ok(resp) if resp.is_success() => return Ok(resp),
            Ok(resp) => DispatchFailure::Status(resp),
            Err(e) => DispatchFailure::Transport(e),
        };

        match should_retry(request.descriptor(), &failure, &state) {
            RetryDecision::RetryAfter(delay) => {
                tracing::warn!(
                    status = failure.status(),
                    attempt = state.attempt,
                    max_attempts = state.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "retrying request"
                );
                tokio::time::sleep(delay).await;
                state.advance();
            }
            RetryDecision::GiveUp => {
                tracing::debug!(status = failure.status(), "not retrying");
                return Err(failure);
            }
        }
    }
}
