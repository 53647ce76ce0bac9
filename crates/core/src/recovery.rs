//! Recovery actions attached to translated errors.

use serde::{Deserialize, Serialize};

/// What the navigation layer should do after an error is surfaced.
///
/// Produced by the error translator; applied by whoever owns navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Leave the error to the calling view.
    #[default]
    None,
    /// Try a silent re-login, else send the user to the entry page with a
    /// session-expired indicator.
    ReauthenticateOrRedirectToLogin,
    /// Land on the dashboard with a forbidden indicator.
    RedirectToDashboardForbidden,
    /// Route to the maintenance page.
    RedirectToMaintenance,
}

impl RecoveryAction {
    /// Recovery action for a response status.
    ///
    /// 404 and everything not listed carry no action.
    pub fn for_status(status: u16) -> Self {
        match status {
            401 => Self::ReauthenticateOrRedirectToLogin,
            403 => Self::RedirectToDashboardForbidden,
            503 => Self::RedirectToMaintenance,
            _ => Self::None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}
