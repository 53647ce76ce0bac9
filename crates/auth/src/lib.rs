//! `portalgate-auth`: pure authorization boundary for the portals.
//!
//! This crate is intentionally decoupled from HTTP, navigation and the
//! identity provider: it only knows claims, principals and requirements.

pub mod authorize;
pub mod claims;
pub mod permissions;
pub mod principal;
pub mod requirement;
pub mod roles;

pub use authorize::{
    AuthzError, EvaluationPolicy, RequirementExplanation, authorize, explain_requirement,
};
pub use claims::{ClaimsDecodeError, TokenClaims, TokenValidationError, validate_claims};
pub use permissions::{Permission, has_permission};
pub use principal::Principal;
pub use requirement::{AuthorizationRequirement, PermissionMode};
pub use roles::Role;
