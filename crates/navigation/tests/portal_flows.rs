//! End-to-end flows: pipeline, session store and navigation controller
//! wired together the way a portal shell wires them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use futures::future::join_all;

use portalgate_auth::{AuthorizationRequirement, Permission, Principal, Role, has_permission};
use portalgate_http::{OutgoingRequest, Pipeline, PipelineConfig, Response, Transport, TransportError};
use portalgate_navigation::{
    Destination, Guard, GuardConfig, GuardDecision, NavigationController, Navigator, ReasonCode,
};
use portalgate_session::{IdentityProvider, ProviderError, SessionStore, TokenSet};

const API: &str = "https://api.example.org/api";

struct Backend {
    replies: Mutex<VecDeque<Response>>,
    seen: Mutex<Vec<(String, Option<String>)>>,
}

impl Backend {
    fn new(replies: Vec<Response>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    fn bearers(&self) -> Vec<Option<String>> {
        self.seen.lock().unwrap().iter().map(|(_, auth)| auth.clone()).collect()
    }
}

#[async_trait]
impl Transport for Backend {
    async fn send(&self, request: &OutgoingRequest) -> Result<Response, TransportError> {
        self.seen.lock().unwrap().push((
            request.descriptor().url().to_string(),
            request.header("authorization").map(str::to_string),
        ));
        let reply = self.replies.lock().unwrap().pop_front();
        Ok(reply.unwrap_or_else(|| Response::new(200, "{}")))
    }
}

#[derive(Default)]
struct Router(Mutex<Vec<Destination>>);

impl Navigator for Router {
    fn navigate(&self, destination: Destination) {
        self.0.lock().unwrap().push(destination);
    }
}

impl Router {
    fn visited(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(ToString::to_string).collect()
    }
}

/// Refreshes slowly so concurrent callers overlap.
#[derive(Default)]
struct SlowProvider {
    refreshes: AtomicUsize,
}

#[async_trait]
impl IdentityProvider for SlowProvider {
    async fn refresh(&self, _refresh_token: &str) -> Result<TokenSet, ProviderError> {
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(TokenSet {
            access_token: format!("fresh-{n}"),
            refresh_token: Some("refresh-2".to_string()),
            expires_at: Utc::now() + ChronoDuration::hours(1),
            provider_session_expires_at: None,
        })
    }

    async fn silent_login(&self) -> Result<TokenSet, ProviderError> {
        Err(ProviderError::Rejected("login_required".to_string()))
    }

    async fn login(&self, _return_to: &str) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn logout(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

struct Portal {
    pipeline: Pipeline,
    session: SessionStore,
    router: Arc<Router>,
    provider: Arc<SlowProvider>,
}

fn portal(backend: Arc<Backend>) -> Portal {
    let provider = Arc::new(SlowProvider::default());
    let session = SessionStore::new(provider.clone());
    let router = Arc::new(Router::default());
    let controller = NavigationController::new(GuardConfig::default(), session.clone(), router.clone());

    let pipeline = Pipeline::builder(PipelineConfig::hub(API), session.clone(), backend)
        .recovery(Arc::new(controller))
        .build()
        .unwrap();

    Portal {
        pipeline,
        session,
        router,
        provider,
    }
}

fn tokens(access: &str, ttl: ChronoDuration, provider_session: Option<ChronoDuration>) -> TokenSet {
    TokenSet {
        access_token: access.to_string(),
        refresh_token: Some("refresh-1".to_string()),
        expires_at: Utc::now() + ttl,
        provider_session_expires_at: provider_session.map(|ttl| Utc::now() + ttl),
    }
}

#[tokio::test(start_paused = true)]
async fn idempotent_update_succeeds_after_two_retries() {
    let backend = Backend::new(vec![Response::new(503, ""), Response::new(503, "")]);
    let portal = portal(backend.clone());
    portal.session.establish(tokens("t1", ChronoDuration::hours(1), None));

    let started = tokio::time::Instant::now();
    let resp = portal
        .pipeline
        .put("declarations/7", serde_json::json!({ "status": "draft" }))
        .await
        .unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(backend.calls(), 3);
    assert_eq!(started.elapsed(), Duration::from_millis(3_000));
    assert!(portal.router.visited().is_empty());
}

#[tokio::test(start_paused = true)]
async fn login_endpoint_failure_is_not_retried() {
    let backend = Backend::new(vec![Response::new(500, "")]);
    let portal = portal(backend.clone());

    let err = portal.pipeline.get("auth/login").await.unwrap_err();

    assert_eq!(err.status(), 500);
    assert_eq!(err.code(), "HTTP_500");
    assert_eq!(backend.calls(), 1);
}

#[test]
fn agent_is_denied_an_admin_route() {
    let guard = Guard::new(GuardConfig::default());
    let agent = Principal::authenticated("agent-1", [Role::new("AGENT")], Vec::<Permission>::new());

    let decision = guard.evaluate("/admin", Some(&AuthorizationRequirement::roles(["ADMIN"])), &agent);

    assert_eq!(
        decision,
        GuardDecision::RedirectTo {
            target: Destination::new("/dashboard"),
            reason: ReasonCode::PermissionDenied,
        }
    );
}

#[test]
fn module_wildcard_grants_module_actions() {
    let granted = [Permission::from("declarations:*")];
    assert!(has_permission(&granted, "declarations:view"));
    assert!(!has_permission(&granted, "payments:view"));
}

#[tokio::test(start_paused = true)]
async fn unauthorized_response_without_provider_session_redirects_to_login() {
    let backend = Backend::new(vec![Response::new(401, r#"{"error":"unauthorized","message":"token revoked"}"#)]);
    let portal = portal(backend.clone());
    portal.session.establish(tokens("t1", ChronoDuration::hours(1), None));

    let err = portal.pipeline.get("declarations").await.unwrap_err();

    assert_eq!(err.status(), 401);
    assert_eq!(err.message(), "token revoked");
    assert_eq!(backend.calls(), 1);
    assert_eq!(portal.router.visited(), vec!["/login?error=session_expired"]);
}

#[tokio::test(start_paused = true)]
async fn concurrent_requests_share_one_token_refresh() {
    let backend = Backend::new(Vec::new());
    let portal = portal(backend.clone());
    portal.session.establish(tokens("stale", ChronoDuration::seconds(10), None));

    let calls = (0..5).map(|i| {
        let pipeline = portal.pipeline.clone();
        async move { pipeline.get(&format!("declarations/{i}")).await }
    });
    let results = join_all(calls).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(portal.provider.refreshes.load(Ordering::SeqCst), 1);
    assert!(
        backend
            .bearers()
            .iter()
            .all(|auth| auth.as_deref() == Some("Bearer fresh-1"))
    );
    assert_eq!(backend.calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn third_party_requests_bypass_session_and_scope() {
    let backend = Backend::new(Vec::new());
    let portal = portal(backend.clone());
    portal.session.establish(tokens("t1", ChronoDuration::hours(1), None));

    portal.pipeline.get("https://tiles.example.com/api/1/2/3.png").await.unwrap();

    assert_eq!(backend.bearers(), vec![None]);
}
