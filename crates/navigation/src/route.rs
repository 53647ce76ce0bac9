//! Authorization data consumed from the declarative route table.

use serde::{Deserialize, Serialize};

use portalgate_auth::{AuthorizationRequirement, PermissionMode, Role};

/// A route's `data` block: `{ roles, permissions, permissionMode }`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteData {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub permission_mode: PermissionMode,
}

impl RouteData {
    /// `None` when the route declares no restriction.
    pub fn requirement(&self) -> Option<AuthorizationRequirement> {
        if self.roles.is_empty() && self.permissions.is_empty() {
            return None;
        }

        Some(AuthorizationRequirement {
            roles: self.roles.iter().cloned().map(Role::from).collect(),
            permissions: self.permissions.clone(),
            mode: self.permission_mode,
        })
    }
}
