//! Seam through which the pipeline hands recovery actions to navigation.

use async_trait::async_trait;

use portalgate_core::{AppError, RecoveryAction};

/// Applies a recovery action for a surfaced error.
///
/// Called at most once per dispatch, only for actions other than
/// [`RecoveryAction::None`], before the error is returned to the caller.
#[async_trait]
pub trait RecoveryHandler: Send + Sync {
    async fn recover(&self, action: RecoveryAction, error: &AppError);
}

/// Leaves every error to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRecovery;

#[async_trait]
impl RecoveryHandler for NoRecovery {
    async fn recover(&self, action: RecoveryAction, error: &AppError) {
        tracing::debug!(?action, code = error.code(), "recovery action ignored");
    }
}
