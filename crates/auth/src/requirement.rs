use serde::{Deserialize, Serialize};

use crate::Role;

/// How a list of required roles or permissions is combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PermissionMode {
    /// At least one listed entry must match.
    #[default]
    Any,
    /// Every listed entry must match.
    All,
}

/// Authorization declared on a route.
///
/// Empty lists mean "no restriction" for that dimension.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthorizationRequirement {
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub mode: PermissionMode,
}

impl AuthorizationRequirement {
    pub fn roles(roles: impl IntoIterator<Item = impl Into<Role>>) -> Self {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn permissions(permissions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            permissions: permissions.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: PermissionMode) -> Self {
        self.mode = mode;
        self
    }

    /// No roles and no permissions listed.
    pub fn is_unrestricted(&self) -> bool {
        self.roles.is_empty() && self.permissions.is_empty()
    }
}
