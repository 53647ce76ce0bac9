use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Wildcard granting every permission.
pub const WILDCARD: &str = "*";

/// Administrative wildcard, equivalent to [`WILDCARD`].
pub const ADMIN_WILDCARD: &str = "admin:*";

/// Permission identifier.
///
/// Permissions are opaque strings of the form `module:action`
/// (e.g. "declarations:view"). Three wildcard forms are understood:
/// `*` and `admin:*` grant everything, `module:*` grants every action of
/// `module`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `*` or `admin:*`.
    pub fn is_wildcard(&self) -> bool {
        matches!(self.as_str(), WILDCARD | ADMIN_WILDCARD)
    }

    /// Module part of a `module:action` permission, or the whole string when
    /// there is no separator.
    pub fn module(&self) -> &str {
        module_of(self.as_str())
    }

    /// `Some(module)` for a `module:*` grant.
    pub fn module_wildcard(&self) -> Option<&str> {
        self.as_str().strip_suffix(":*")
    }

    /// Whether this single grant covers `required`.
    pub fn grants(&self, required: &str) -> bool {
        self.as_str() == required
            || self.is_wildcard()
            || self.module_wildcard().is_some_and(|m| m == module_of(required))
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Permission {
    fn from(value: &str) -> Self {
        Self(Cow::Owned(value.to_string()))
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

fn module_of(permission: &str) -> &str {
    permission.split_once(':').map_or(permission, |(module, _)| module)
}

/// Check whether `granted` covers `required`.
///
/// Forms are checked in order: exact match, global wildcard (`*` or
/// `admin:*`), then module wildcard (`<module(required)>:*`).
pub fn has_permission(granted: &[Permission], required: &str) -> bool {
    if granted.iter().any(|p| p.as_str() == required) {
        return true;
    }

    if granted.iter().any(Permission::is_wildcard) {
        return true;
    }

    let module = module_of(required);
    granted
        .iter()
        .filter_map(Permission::module_wildcard)
        .any(|m| m == module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn perms(list: &[&str]) -> Vec<Permission> {
        list.iter().map(|p| Permission::from(*p)).collect()
    }

    #[test]
    fn exact_match_grants() {
        assert!(has_permission(&perms(&["declarations:view"]), "declarations:view"));
        assert!(!has_permission(&perms(&["declarations:view"]), "declarations:edit"));
    }

    #[test]
    fn module_wildcard_grants_actions_in_module() {
        let granted = perms(&["declarations:*"]);
        assert!(has_permission(&granted, "declarations:view"));
        assert!(has_permission(&granted, "declarations:approve"));
        assert!(!has_permission(&granted, "payments:view"));
    }

    #[test]
    fn module_wildcard_does_not_match_prefix_of_other_module() {
        let granted = perms(&["decl:*"]);
        assert!(!has_permission(&granted, "declarations:view"));
    }

    #[test]
    fn global_wildcards_grant_everything() {
        assert!(has_permission(&perms(&["*"]), "payments:refund"));
        assert!(has_permission(&perms(&["admin:*"]), "payments:refund"));
    }

    #[test]
    fn empty_grants_deny() {
        assert!(!has_permission(&[], "declarations:view"));
    }

    #[test]
    fn permission_without_action_uses_whole_string_as_module() {
        let granted = perms(&["reports:*"]);
        assert!(has_permission(&granted, "reports"));
        assert_eq!(Permission::from("reports").module(), "reports");
    }

    fn segment() -> impl Strategy<Value = String> {
        "[a-z]{1,8}"
    }

    proptest! {
        #[test]
        fn contained_permission_is_always_granted(
            module in segment(),
            action in segment(),
            others in proptest::collection::vec("[a-z]{1,8}:[a-z]{1,8}", 0..5),
        ) {
            let required = format!("{module}:{action}");
            let mut granted: Vec<Permission> = others.into_iter().map(Permission::from).collect();
            granted.push(Permission::from(required.clone()));
            prop_assert!(has_permission(&granted, &required));
        }

        #[test]
        fn module_wildcard_matches_only_its_module(
            module in segment(),
            other in segment(),
            action in segment(),
        ) {
            let granted = vec![Permission::from(format!("{module}:*"))];
            let required = format!("{module}:{action}");
            prop_assert!(has_permission(&granted, &required));
            // "admin" is itself a global wildcard module.
            prop_assume!(module != "admin");
            prop_assert_eq!(
                has_permission(&granted, &format!("{other}:{action}")),
                other == module
            );
        }

        #[test]
        fn grants_without_wildcards_are_exact(
            granted in proptest::collection::vec("[a-z]{1,4}:[a-z]{1,4}", 0..6),
            required in "[a-z]{1,4}:[a-z]{1,4}",
        ) {
            let expected = granted.iter().any(|g| g == &required);
            let granted: Vec<Permission> = granted.into_iter().map(Permission::from).collect();
            prop_assert_eq!(has_permission(&granted, &required), expected);
        }
    }
}
