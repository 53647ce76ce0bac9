//! The request pipeline every outgoing API call passes through.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tracing::Instrument;

use portalgate_core::AppError;
use portalgate_session::SessionStore;

use crate::config::{ConfigError, PipelineConfig, ResolvedConfig};
use crate::cookies::{CookieMap, CookieSource};
use crate::loading::LoadingTracker;
use crate::recovery::{NoRecovery, RecoveryHandler};
use crate::request::{Method, OutgoingRequest, RequestDescriptor, Response};
use crate::retry::send_with_retry;
use crate::stages::{CsrfAttacher, ScopeHeaders, TokenInjector};
use crate::transport::Transport;
use crate::translate::translate;

/// Fixed-order composition of the dispatch stages:
///
/// 1. loading tracker
/// 2. token injector (plus instance/correlation headers)
/// 3. CSRF attacher
/// 4. retry engine around the transport
/// 5. error translator and recovery
#[derive(Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    resolved: ResolvedConfig,
    loading: LoadingTracker,
    scope: ScopeHeaders,
    token: TokenInjector,
    csrf: CsrfAttacher,
    transport: Arc<dyn Transport>,
    recovery: Arc<dyn RecoveryHandler>,
}

pub struct PipelineBuilder {
    config: PipelineConfig,
    session: SessionStore,
    transport: Arc<dyn Transport>,
    cookies: Arc<dyn CookieSource>,
    recovery: Arc<dyn RecoveryHandler>,
    loading: LoadingTracker,
}

impl PipelineBuilder {
    pub fn cookies(mut self, cookies: Arc<dyn CookieSource>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn recovery(mut self, recovery: Arc<dyn RecoveryHandler>) -> Self {
        self.recovery = recovery;
        self
    }

    /// Share a loading tracker with another pipeline or the UI shell.
    pub fn loading(mut self, loading: LoadingTracker) -> Self {
        self.loading = loading;
        self
    }

    pub fn build(self) -> Result<Pipeline, ConfigError> {
        let resolved = self.config.validate()?;

        Ok(Pipeline {
            scope: ScopeHeaders::new(&resolved),
            token: TokenInjector::new(
                self.session,
                Duration::from_millis(self.config.token_min_validity_ms),
                self.config.unauthenticated_paths.clone(),
            ),
            csrf: CsrfAttacher::new(
                self.config.csrf.enabled,
                self.config.csrf.cookie_name.clone(),
                resolved.csrf_header.clone(),
                self.cookies,
            ),
            loading: self.loading,
            transport: self.transport,
            recovery: self.recovery,
            resolved,
            config: self.config,
        })
    }
}

impl Pipeline {
    pub fn builder(
        config: PipelineConfig,
        session: SessionStore,
        transport: Arc<dyn Transport>,
    ) -> PipelineBuilder {
        PipelineBuilder {
            config,
            session,
            transport,
            cookies: Arc::new(CookieMap::new()),
            recovery: Arc::new(NoRecovery),
            loading: LoadingTracker::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn loading(&self) -> &LoadingTracker {
        &self.loading
    }

    /// Build a descriptor for `target`: an `http(s)://` URL, or a path
    /// relative to the API base.
    pub fn describe(&self, method: Method, target: &str) -> Result<RequestDescriptor, AppError> {
        let url = if is_absolute_http(target) {
            Url::parse(target)
        } else {
            // "./" keeps a colon in the first segment from reading as a scheme.
            self.resolved
                .api_base
                .join(&format!("./{}", target.trim_start_matches('/')))
        }
        .map_err(|e| AppError::client("INVALID_URL", format!("{target}: {e}")))?;
        Ok(RequestDescriptor::new(method, url, &self.config.retry.excluded_paths))
    }

    /// Send a request through every stage.
    ///
    /// Every failure reaches the caller as an [`AppError`]; recovery actions
    /// are applied before it is returned.
    pub async fn dispatch(
        &self,
        descriptor: RequestDescriptor,
        body: Option<serde_json::Value>,
    ) -> Result<Response, AppError> {
        let _loading = self.loading.begin();
        let mut request = OutgoingRequest::new(descriptor, body);

        let span = tracing::info_span!(
            "dispatch",
            request_id = %request.id(),
            method = %request.descriptor().method(),
            url = %request.descriptor().url(),
        );

        async move {
            if self.resolved.is_api_request(request.descriptor().url()) {
                self.scope.apply(&mut request);
                self.token.apply(&mut request).await;
                self.csrf.apply(&mut request);
            }

            let failure = match send_with_retry(self.transport.as_ref(), &request, &self.config.retry).await {
                Ok(resp) => {
                    tracing::debug!(status = resp.status, "request succeeded");
                    return Ok(resp);
                }
                Err(failure) => failure,
            };

            let (error, action) = translate(&failure);
            tracing::info!(status = error.status(), code = error.code(), ?action, "request failed");
            if !action.is_none() {
                self.recovery.recover(action, &error).await;
            }
            Err(error)
        }
        .instrument(span)
        .await
    }

    pub async fn get(&self, target: &str) -> Result<Response, AppError> {
        self.dispatch(self.describe(Method::Get, target)?, None).await
    }

    pub async fn post(&self, target: &str, body: serde_json::Value) -> Result<Response, AppError> {
        self.dispatch(self.describe(Method::Post, target)?, Some(body)).await
    }

    pub async fn put(&self, target: &str, body: serde_json::Value) -> Result<Response, AppError> {
        self.dispatch(self.describe(Method::Put, target)?, Some(body)).await
    }

    pub async fn patch(&self, target: &str, body: serde_json::Value) -> Result<Response, AppError> {
        self.dispatch(self.describe(Method::Patch, target)?, Some(body)).await
    }

    pub async fn delete(&self, target: &str) -> Result<Response, AppError> {
        self.dispatch(self.describe(Method::Delete, target)?, None).await
    }
}

fn is_absolute_http(target: &str) -> bool {
    let lower = target.get(..8).unwrap_or(target).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use portalgate_core::RecoveryAction;
    use portalgate_session::{StaticProvider, TokenSet};

    use crate::transport::TransportError;

    /// Records every request it sees and replies from a script.
    #[derive(Default)]
    struct Recorder {
        replies: Mutex<VecDeque<Result<Response, TransportError>>>,
        seen: Mutex<Vec<OutgoingRequest>>,
    }

    impl Recorder {
        fn replying(replies: Vec<Result<Response, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::default(),
            })
        }

        fn seen(&self) -> Vec<OutgoingRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn send(&self, request: &OutgoingRequest) -> Result<Response, TransportError> {
            self.seen.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Response::new(200, "{}")))
        }
    }

    #[derive(Default)]
    struct RecordingRecovery {
        actions: Mutex<Vec<RecoveryAction>>,
    }

    #[async_trait]
    impl RecoveryHandler for RecordingRecovery {
        async fn recover(&self, action: RecoveryAction, _error: &AppError) {
            self.actions.lock().unwrap().push(action);
        }
    }

    fn logged_in() -> SessionStore {
        let store = SessionStore::new(Arc::new(StaticProvider));
        store.establish(TokenSet {
            access_token: "tok".to_string(),
            refresh_token: None,
            expires_at: Utc::now() + ChronoDuration::minutes(10),
            provider_session_expires_at: None,
        });
        store
    }

    fn cookies_with_csrf() -> Arc<CookieMap> {
        let cookies = CookieMap::new();
        cookies.set("XSRF-TOKEN", "csrf-1");
        Arc::new(cookies)
    }

    fn instance_pipeline(session: SessionStore, transport: Arc<Recorder>) -> Pipeline {
        Pipeline::builder(
            PipelineConfig::instance("https://api.example.org/api", "KE"),
            session,
            transport,
        )
        .cookies(cookies_with_csrf())
        .build()
        .unwrap()
    }

    #[tokio::test]
    async fn api_requests_carry_token_instance_and_request_id() {
        let transport = Recorder::replying(vec![]);
        let pipeline = instance_pipeline(logged_in(), transport.clone());

        pipeline.get("declarations").await.unwrap();

        let seen = transport.seen();
        assert_eq!(seen[0].header("authorization"), Some("Bearer tok"));
        assert_eq!(seen[0].header("x-instance-id"), Some("KE"));
        assert_eq!(seen[0].header("x-request-id"), Some(seen[0].id().to_string().as_str()));
    }

    #[tokio::test]
    async fn third_party_requests_are_left_alone() {
        let transport = Recorder::replying(vec![]);
        let pipeline = instance_pipeline(logged_in(), transport.clone());

        pipeline.post("https://maps.example.com/geocode", serde_json::json!({})).await.unwrap();

        let seen = transport.seen();
        assert!(seen[0].headers().is_empty());
    }

    #[tokio::test]
    async fn safe_methods_never_get_csrf_header() {
        let transport = Recorder::replying(vec![]);
        let pipeline = instance_pipeline(logged_in(), transport.clone());

        for method in [Method::Get, Method::Head, Method::Options] {
            let d = pipeline.describe(method, "declarations").unwrap();
            pipeline.dispatch(d, None).await.unwrap();
        }
        pipeline.put("declarations/1", serde_json::json!({"status": "draft"})).await.unwrap();

        let seen = transport.seen();
        for req in &seen[..3] {
            assert_eq!(req.header("x-xsrf-token"), None);
        }
        assert_eq!(seen[3].header("x-xsrf-token"), Some("csrf-1"));
    }

    #[tokio::test]
    async fn csrf_disabled_or_cookie_missing_leaves_request_unmodified() {
        let transport = Recorder::replying(vec![]);
        let hub = Pipeline::builder(
            PipelineConfig::hub("https://api.example.org/api"),
            logged_in(),
            transport.clone(),
        )
        .cookies(cookies_with_csrf())
        .build()
        .unwrap();
        hub.post("declarations", serde_json::json!({})).await.unwrap();

        let no_cookie = Pipeline::builder(
            PipelineConfig::instance("https://api.example.org/api", "KE"),
            logged_in(),
            transport.clone(),
        )
        .build()
        .unwrap();
        no_cookie.post("declarations", serde_json::json!({})).await.unwrap();

        for req in transport.seen() {
            assert_eq!(req.header("x-xsrf-token"), None);
        }
    }

    #[tokio::test]
    async fn missing_session_sends_without_token() {
        let transport = Recorder::replying(vec![Ok(Response::new(401, ""))]);
        let recovery = Arc::new(RecordingRecovery::default());
        let pipeline = Pipeline::builder(
            PipelineConfig::hub("https://api.example.org/api"),
            SessionStore::new(Arc::new(StaticProvider)),
            transport.clone(),
        )
        .recovery(recovery.clone())
        .build()
        .unwrap();

        let err = pipeline.get("declarations").await.unwrap_err();

        assert_eq!(transport.seen()[0].header("authorization"), None);
        assert_eq!(err.status(), 401);
        assert_eq!(
            *recovery.actions.lock().unwrap(),
            vec![RecoveryAction::ReauthenticateOrRedirectToLogin]
        );
    }

    #[tokio::test]
    async fn failed_refresh_sends_without_token_and_recovers_on_401() {
        let transport = Recorder::replying(vec![Ok(Response::new(401, ""))]);
        let recovery = Arc::new(RecordingRecovery::default());
        // StaticProvider cannot refresh, so the near-expiry token is dropped.
        let session = SessionStore::new(Arc::new(StaticProvider));
        session.establish(TokenSet {
            access_token: "stale".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: Utc::now() + ChronoDuration::seconds(5),
            provider_session_expires_at: None,
        });
        let pipeline = Pipeline::builder(
            PipelineConfig::hub("https://api.example.org/api"),
            session.clone(),
            transport.clone(),
        )
        .recovery(recovery.clone())
        .build()
        .unwrap();

        let err = pipeline.get("declarations").await.unwrap_err();

        assert_eq!(transport.seen().len(), 1);
        assert_eq!(transport.seen()[0].header("authorization"), None);
        assert!(!session.is_authenticated());
        assert_eq!(err.status(), 401);
        assert_eq!(
            *recovery.actions.lock().unwrap(),
            vec![RecoveryAction::ReauthenticateOrRedirectToLogin]
        );
    }

    #[tokio::test]
    async fn unauthenticated_paths_skip_token() {
        let transport = Recorder::replying(vec![]);
        let mut config = PipelineConfig::hub("https://api.example.org/api");
        config.unauthenticated_paths = vec!["/api/public/".to_string()];
        let pipeline = Pipeline::builder(config, logged_in(), transport.clone()).build().unwrap();

        pipeline.get("public/announcements").await.unwrap();
        pipeline.get("declarations").await.unwrap();

        let seen = transport.seen();
        assert_eq!(seen[0].header("authorization"), None);
        assert_eq!(seen[1].header("authorization"), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn not_found_has_no_recovery() {
        let transport = Recorder::replying(vec![Ok(Response::new(404, ""))]);
        let recovery = Arc::new(RecordingRecovery::default());
        let pipeline = Pipeline::builder(
            PipelineConfig::hub("https://api.example.org/api"),
            logged_in(),
            transport,
        )
        .recovery(recovery.clone())
        .build()
        .unwrap();

        let err = pipeline.get("declarations/404").await.unwrap_err();
        assert_eq!(err.code(), "HTTP_404");
        assert!(recovery.actions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn loading_counter_returns_to_zero_after_success_and_error() {
        let transport = Recorder::replying(vec![Ok(Response::new(400, ""))]);
        let pipeline = instance_pipeline(logged_in(), transport);

        let _ = pipeline.get("declarations").await;
        pipeline.get("declarations").await.unwrap();
        assert_eq!(pipeline.loading().outstanding(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_dispatch_decrements_loading_once() {
        let transport = Recorder::replying(vec![Ok(Response::new(503, "")); 4]);
        let pipeline = instance_pipeline(logged_in(), transport.clone());

        let outcome = tokio::time::timeout(Duration::from_millis(500), pipeline.get("declarations")).await;

        assert!(outcome.is_err(), "dispatch should still be backing off");
        assert_eq!(transport.seen().len(), 1);
        assert_eq!(pipeline.loading().outstanding(), 0);
    }

    #[tokio::test]
    async fn invalid_targets_are_client_errors() {
        let pipeline = instance_pipeline(logged_in(), Recorder::replying(vec![]));
        let err = pipeline.describe(Method::Get, "http://[::1").unwrap_err();
        assert_eq!(err.code(), "INVALID_URL");
    }

    #[tokio::test]
    async fn colon_in_relative_target_stays_on_the_api() {
        let transport = Recorder::replying(vec![]);
        let pipeline = instance_pipeline(logged_in(), transport.clone());

        let d = pipeline.describe(Method::Get, "reports:summary").unwrap();
        assert_eq!(d.url().as_str(), "https://api.example.org/api/reports:summary");

        pipeline.get("/reports:summary").await.unwrap();
        assert_eq!(transport.seen()[0].header("authorization"), Some("Bearer tok"));

        let abs = pipeline.describe(Method::Get, "HTTPS://maps.example.com/tiles").unwrap();
        assert_eq!(abs.url().host_str(), Some("maps.example.com"));
    }
}
