use serde::{Deserialize, Serialize};

use portalgate_auth::EvaluationPolicy;

/// Redirect targets and guard policy for one portal deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Entry page for unauthenticated users and expired sessions.
    #[serde(default = "default_login_route")]
    pub login_route: String,

    /// Where permission denials and 403s land.
    #[serde(default = "default_unauthorized_route")]
    pub unauthorized_route: String,

    #[serde(default = "default_maintenance_route")]
    pub maintenance_route: String,

    /// Authenticated principals with no roles (or no permissions) pass the
    /// corresponding check. Development-mode fallback; security relevant.
    #[serde(default = "default_true")]
    pub allow_when_grants_empty: bool,

    /// Ask the identity provider to start a login before redirecting an
    /// unauthenticated user.
    #[serde(default = "default_true")]
    pub trigger_login_on_unauthenticated: bool,
}

fn default_login_route() -> String {
    "/login".to_string()
}

fn default_unauthorized_route() -> String {
    "/dashboard".to_string()
}

fn default_maintenance_route() -> String {
    "/maintenance".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            login_route: default_login_route(),
            unauthorized_route: default_unauthorized_route(),
            maintenance_route: default_maintenance_route(),
            allow_when_grants_empty: true,
            trigger_login_on_unauthenticated: true,
        }
    }
}

impl GuardConfig {
    pub fn evaluation_policy(&self) -> EvaluationPolicy {
        EvaluationPolicy {
            allow_when_grants_empty: self.allow_when_grants_empty,
        }
    }
}
