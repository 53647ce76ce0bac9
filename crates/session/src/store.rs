//! Session store with single-flight token refresh.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use portalgate_auth::Principal;

use crate::{IdentityProvider, Session, SessionError, TokenSet};

type RefreshOutcome = Shared<BoxFuture<'static, Result<String, SessionError>>>;

/// Owner of the current [`Session`].
///
/// Cheap to clone; clones share the same state. At most one refresh is in
/// flight at any time and every caller that needs a refresh while one is
/// running awaits that same outcome.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    provider: Arc<dyn IdentityProvider>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    session: Option<Session>,
    refresh: Option<InFlight>,
    /// Bumped whenever the session is established or cleared, so a refresh
    /// started for an older session cannot overwrite a newer one.
    epoch: u64,
}

struct InFlight {
    epoch: u64,
    outcome: RefreshOutcome,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_refresh(
        self: Arc<Self>,
        refresh_token: String,
        epoch: u64,
    ) -> Result<String, SessionError> {
        tracing::debug!("refreshing access token");
        let result = self.provider.refresh(&refresh_token).await;

        let mut state = self.lock();
        if state.epoch != epoch {
            // Logged out or logged in again while the refresh was running.
            tracing::debug!("discarding refresh result for a superseded session");
            return state
                .session
                .as_ref()
                .map(|s| s.access_token().to_string())
                .ok_or(SessionError::Expired);
        }

        state.refresh = None;
        match result {
            Ok(tokens) => {
                let session = Session::from_tokens(tokens);
                let token = session.access_token().to_string();
                tracing::info!(expires_at = %session.expires_at(), "access token refreshed");
                state.session = Some(session);
                Ok(token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed; clearing session");
                state.session = None;
                state.epoch += 1;
                Err(SessionError::Expired)
            }
        }
    }
}

impl SessionStore {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Create the session after a successful login.
    pub fn establish(&self, tokens: TokenSet) {
        let session = Session::from_tokens(tokens);
        tracing::info!(expires_at = %session.expires_at(), "session established");

        let mut state = self.inner.lock();
        state.session = Some(session);
        state.refresh = None;
        state.epoch += 1;
    }

    /// Drop the session and end the provider session.
    ///
    /// The local session is cleared even if the provider call fails. A
    /// refresh still in flight resolves as expired for its waiters.
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.clear();
        tracing::info!("session cleared by logout");
        self.inner.provider.logout().await?;
        Ok(())
    }

    fn clear(&self) {
        let mut state = self.inner.lock();
        state.session = None;
        state.refresh = None;
        state.epoch += 1;
    }

    /// False before the first login and after logout or a failed refresh.
    pub fn is_authenticated(&self) -> bool {
        self.inner.lock().session.is_some()
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Option<Session> {
        self.inner.lock().session.clone()
    }

    /// Principal view of the current session (anonymous when there is none).
    pub fn principal(&self) -> Principal {
        self.inner
            .lock()
            .session
            .as_ref()
            .map(Session::principal)
            .unwrap_or_else(Principal::anonymous)
    }

    /// Whether the provider can still issue tokens without user interaction.
    pub fn provider_session_live(&self) -> bool {
        self.inner
            .lock()
            .session
            .as_ref()
            .is_some_and(|s| s.provider_session_live(Utc::now()))
    }

    /// Return an access token valid for at least `min_validity`.
    ///
    /// Starts a refresh when the current token is about to expire, or joins
    /// the refresh already in flight. On refresh failure every waiter gets
    /// [`SessionError::Expired`] and the session is cleared.
    pub async fn get_valid_token(&self, min_validity: Duration) -> Result<String, SessionError> {
        let outcome = {
            let mut state = self.inner.lock();
            let epoch = state.epoch;

            let (remaining, access_token, refresh_token) = match state.session.as_ref() {
                None => return Err(SessionError::NotAuthenticated),
                Some(s) => (
                    s.remaining(Utc::now()),
                    s.access_token().to_string(),
                    s.refresh_token().map(str::to_string),
                ),
            };

            if remaining >= min_validity {
                return Ok(access_token);
            }

            let joined = state
                .refresh
                .as_ref()
                .filter(|in_flight| in_flight.epoch == epoch)
                .map(|in_flight| in_flight.outcome.clone());

            match (joined, refresh_token) {
                (Some(outcome), _) => {
                    tracing::debug!("joining in-flight token refresh");
                    outcome
                }
                (None, Some(refresh_token)) => {
                    let outcome = self
                        .inner
                        .clone()
                        .run_refresh(refresh_token, epoch)
                        .boxed()
                        .shared();
                    state.refresh = Some(InFlight {
                        epoch,
                        outcome: outcome.clone(),
                    });
                    outcome
                }
                (None, None) => {
                    tracing::warn!("access token expiring and no refresh token; clearing session");
                    state.session = None;
                    state.epoch += 1;
                    return Err(SessionError::Expired);
                }
            }
        };

        outcome.await
    }

    /// Re-establish the session silently from a live provider session.
    pub async fn try_silent_login(&self) -> Result<(), SessionError> {
        if !self.provider_session_live() {
            return Err(SessionError::Expired);
        }

        match self.inner.provider.silent_login().await {
            Ok(tokens) => {
                self.establish(tokens);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "silent re-login failed; clearing session");
                self.clear();
                Err(SessionError::Expired)
            }
        }
    }

    /// Ask the provider to start an interactive login.
    pub async fn begin_login(&self, return_to: &str) -> Result<(), SessionError> {
        self.inner.provider.login(return_to).await?;
        Ok(())
    }
}

impl core::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("SessionStore")
            .field("authenticated", &state.session.is_some())
            .field("refresh_in_flight", &state.refresh.is_some())
            .finish()
    }
}
