use std::collections::HashSet;

use crate::{Permission, Role, TokenClaims, has_permission};

/// The identity the client acts as, as far as authorization is concerned.
///
/// Derived from the session on demand; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Principal {
    subject: Option<String>,
    roles: HashSet<Role>,
    permissions: Vec<Permission>,
    authenticated: bool,
}

impl Principal {
    /// Principal for a client with no session.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(
        subject: impl Into<String>,
        roles: impl IntoIterator<Item = Role>,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        Self {
            subject: Some(subject.into()),
            roles: roles.into_iter().collect(),
            permissions: permissions.into_iter().collect(),
            authenticated: true,
        }
    }

    pub fn from_claims(claims: &TokenClaims) -> Self {
        Self::authenticated(
            claims.sub.clone(),
            claims.roles.iter().cloned(),
            claims.permissions.iter().cloned(),
        )
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn roles(&self) -> &HashSet<Role> {
        &self.roles
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn has_permission(&self, required: &str) -> bool {
        has_permission(&self.permissions, required)
    }
}
