use serde::Serialize;
use thiserror::Error;

use crate::{AuthorizationRequirement, PermissionMode, Principal};

/// Knobs of the requirement evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationPolicy {
    /// Treat an authenticated principal whose role (or permission) list is
    /// empty as satisfying the role (or permission) check.
    ///
    /// This is the portals' development-mode fallback. It is on by default
    /// and must be turned off explicitly for hardened deployments.
    pub allow_when_grants_empty: bool,
}

impl Default for EvaluationPolicy {
    fn default() -> Self {
        Self {
            allow_when_grants_empty: true,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("principal is not authenticated")]
    Unauthenticated,

    #[error("forbidden: missing role(s) {0:?}")]
    MissingRoles(Vec<String>),

    #[error("forbidden: missing permission(s) {0:?}")]
    MissingPermissions(Vec<String>),
}

/// Detailed outcome of evaluating a requirement against a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequirementExplanation {
    pub granted: bool,
    pub authenticated: bool,
    pub mode: PermissionMode,
    pub matched_roles: Vec<String>,
    pub missing_roles: Vec<String>,
    pub matched_permissions: Vec<String>,
    pub missing_permissions: Vec<String>,
    /// The empty-grant fallback decided at least one dimension.
    pub empty_grants_bypass: bool,
    pub reason: String,
}

/// Evaluate a requirement, reporting what matched and what did not.
pub fn explain_requirement(
    principal: &Principal,
    requirement: &AuthorizationRequirement,
    policy: EvaluationPolicy,
) -> RequirementExplanation {
    let mut explanation = RequirementExplanation {
        granted: false,
        authenticated: principal.is_authenticated(),
        mode: requirement.mode,
        matched_roles: Vec::new(),
        missing_roles: Vec::new(),
        matched_permissions: Vec::new(),
        missing_permissions: Vec::new(),
        empty_grants_bypass: false,
        reason: String::new(),
    };

    if requirement.is_unrestricted() {
        explanation.granted = true;
        explanation.reason = "requirement lists no roles or permissions".to_string();
        return explanation;
    }

    if !principal.is_authenticated() {
        explanation.reason = "principal is not authenticated".to_string();
        return explanation;
    }

    let roles_ok = if requirement.roles.is_empty() {
        true
    } else if principal.roles().is_empty() && policy.allow_when_grants_empty {
        tracing::warn!(
            subject = principal.subject().unwrap_or_default(),
            "principal has no roles; allowing role check under empty-grant policy"
        );
        explanation.empty_grants_bypass = true;
        true
    } else {
        for role in &requirement.roles {
            if principal.has_role(role) {
                explanation.matched_roles.push(role.to_string());
            } else {
                explanation.missing_roles.push(role.to_string());
            }
        }
        satisfied(requirement.mode, &explanation.matched_roles, &explanation.missing_roles)
    };

    let permissions_ok = if requirement.permissions.is_empty() {
        true
    } else if principal.permissions().is_empty() && policy.allow_when_grants_empty {
        tracing::warn!(
            subject = principal.subject().unwrap_or_default(),
            "principal has no permissions; allowing permission check under empty-grant policy"
        );
        explanation.empty_grants_bypass = true;
        true
    } else {
        for permission in &requirement.permissions {
            if principal.has_permission(permission) {
                explanation.matched_permissions.push(permission.clone());
            } else {
                explanation.missing_permissions.push(permission.clone());
            }
        }
        satisfied(
            requirement.mode,
            &explanation.matched_permissions,
            &explanation.missing_permissions,
        )
    };

    explanation.granted = roles_ok && permissions_ok;
    explanation.reason = match (roles_ok, permissions_ok) {
        (true, true) if explanation.empty_grants_bypass => {
            "granted by empty-grant policy".to_string()
        }
        (true, true) => format!("requirement satisfied ({:?} mode)", requirement.mode),
        (false, _) => format!("missing role(s): {:?}", explanation.missing_roles),
        (true, false) => format!("missing permission(s): {:?}", explanation.missing_permissions),
    };

    explanation
}

fn satisfied(mode: PermissionMode, matched: &[String], missing: &[String]) -> bool {
    match mode {
        PermissionMode::Any => !matched.is_empty(),
        PermissionMode::All => missing.is_empty(),
    }
}

/// Authorize a principal against a route requirement.
///
/// - No IO
/// - No panics
/// - Roles and permissions are separate checks; both must pass
pub fn authorize(
    principal: &Principal,
    requirement: &AuthorizationRequirement,
    policy: EvaluationPolicy,
) -> Result<(), AuthzError> {
    let explanation = explain_requirement(principal, requirement, policy);
    if explanation.granted {
        return Ok(());
    }
    if !explanation.authenticated {
        return Err(AuthzError::Unauthenticated);
    }

    let roles_failed = match requirement.mode {
        PermissionMode::Any => {
            !explanation.missing_roles.is_empty() && explanation.matched_roles.is_empty()
        }
        PermissionMode::All => !explanation.missing_roles.is_empty(),
    };
    if roles_failed {
        Err(AuthzError::MissingRoles(explanation.missing_roles))
    } else {
        Err(AuthzError::MissingPermissions(explanation.missing_permissions))
    }
}
