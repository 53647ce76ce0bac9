//! Applies guard decisions and recovery actions to the router.

use std::sync::Arc;

use async_trait::async_trait;

use portalgate_core::{AppError, RecoveryAction};
use portalgate_http::RecoveryHandler;
use portalgate_session::SessionStore;

use crate::config::GuardConfig;
use crate::guard::{Guard, GuardDecision, ReasonCode};
use crate::navigator::{Destination, Navigator};
use crate::route::RouteData;

/// What a recovery action ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    Nothing,
    /// A silent re-login restored the session; no navigation happened.
    Reauthenticated,
    Redirected(Destination),
}

#[derive(Clone)]
pub struct NavigationController {
    guard: Guard,
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
}

impl NavigationController {
    pub fn new(config: GuardConfig, session: SessionStore, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            guard: Guard::new(config),
            session,
            navigator,
        }
    }

    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    /// Guard decision for `path` against the current principal, without
    /// side effects.
    pub fn can_activate(&self, path: &str, route: Option<&RouteData>) -> GuardDecision {
        let requirement = route.and_then(RouteData::requirement);
        self.guard
            .evaluate(path, requirement.as_ref(), &self.session.principal())
    }

    /// Navigate to `path`, or to wherever the guard redirects.
    ///
    /// An unauthenticated user may first be handed to the identity
    /// provider's interactive login when the config asks for it.
    pub async fn enter(&self, path: &str, route: Option<&RouteData>) -> GuardDecision {
        let decision = self.can_activate(path, route);

        match &decision {
            GuardDecision::Allow => self.navigator.navigate(Destination::new(path)),
            GuardDecision::RedirectTo { target, reason } => {
                if *reason == ReasonCode::Unauthenticated
                    && self.guard.config().trigger_login_on_unauthenticated
                {
                    if let Err(e) = self.session.begin_login(path).await {
                        tracing::warn!(error = %e, path, "could not start interactive login");
                    }
                }
                self.navigator.navigate(target.clone());
            }
        }

        decision
    }

    /// Carry out a recovery action produced by the error translator.
    pub async fn apply(&self, action: RecoveryAction) -> RecoveryOutcome {
        let config = self.guard.config();

        let target = match action {
            RecoveryAction::None => return RecoveryOutcome::Nothing,
            RecoveryAction::ReauthenticateOrRedirectToLogin => {
                match self.session.try_silent_login().await {
                    Ok(()) => {
                        tracing::info!("session restored by silent re-login");
                        return RecoveryOutcome::Reauthenticated;
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "silent re-login unavailable");
                        Destination::new(&config.login_route)
                            .with_query("error", ReasonCode::SessionExpired.as_str())
                    }
                }
            }
            RecoveryAction::RedirectToDashboardForbidden => Destination::new(&config.unauthorized_route)
                .with_query("error", ReasonCode::Forbidden.as_str()),
            RecoveryAction::RedirectToMaintenance => Destination::new(&config.maintenance_route),
        };

        tracing::info!(?action, target = %target, "recovery redirect");
        self.navigator.navigate(target.clone());
        RecoveryOutcome::Redirected(target)
    }
}

#[async_trait]
impl RecoveryHandler for NavigationController {
    async fn recover(&self, action: RecoveryAction, error: &AppError) {
        tracing::debug!(code = error.code(), status = error.status(), "recovering from request failure");
        self.apply(action).await;
    }
}

impl core::fmt::Debug for NavigationController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NavigationController")
            .field("guard", &self.guard)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
