//! Route guard: decides whether a navigation may proceed.

use serde::Serialize;

use portalgate_auth::{AuthorizationRequirement, AuthzError, Principal, authorize};

use crate::config::GuardConfig;
use crate::navigator::Destination;

/// Why a navigation or request ended in a redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    Unauthenticated,
    PermissionDenied,
    SessionExpired,
    Forbidden,
}

impl ReasonCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::PermissionDenied => "permission_denied",
            Self::SessionExpired => "session_expired",
            Self::Forbidden => "forbidden",
        }
    }
}

impl core::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    RedirectTo {
        target: Destination,
        reason: ReasonCode,
    },
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn reason(&self) -> Option<ReasonCode> {
        match self {
            Self::Allow => None,
            Self::RedirectTo { reason, .. } => Some(*reason),
        }
    }
}

/// Pure evaluation of route requirements against a principal.
#[derive(Debug, Clone, Default)]
pub struct Guard {
    config: GuardConfig,
}

impl Guard {
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Decide entry to `path`.
    ///
    /// Routes without a requirement are open to everyone, including
    /// anonymous users. Unauthenticated users are sent to the login route
    /// with `returnUrl` set; authenticated users failing the requirement are
    /// sent to the unauthorized route.
    pub fn evaluate(
        &self,
        path: &str,
        requirement: Option<&AuthorizationRequirement>,
        principal: &Principal,
    ) -> GuardDecision {
        let Some(requirement) = requirement.filter(|r| !r.is_unrestricted()) else {
            return GuardDecision::Allow;
        };

        match authorize(principal, requirement, self.config.evaluation_policy()) {
            Ok(()) => GuardDecision::Allow,
            Err(AuthzError::Unauthenticated) => {
                tracing::debug!(path, "unauthenticated navigation to protected route");
                GuardDecision::RedirectTo {
                    target: Destination::new(&self.config.login_route).with_query("returnUrl", path),
                    reason: ReasonCode::Unauthenticated,
                }
            }
            Err(e) => {
                tracing::info!(
                    path,
                    subject = principal.subject().unwrap_or_default(),
                    error = %e,
                    "navigation denied"
                );
                GuardDecision::RedirectTo {
                    target: Destination::new(&self.config.unauthorized_route),
                    reason: ReasonCode::PermissionDenied,
                }
            }
        }
    }
}
