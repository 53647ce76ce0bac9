//! Error translator: raw failures to [`AppError`] plus a recovery action.

use portalgate_core::{AppError, RecoveryAction};

use crate::retry::DispatchFailure;
use crate::transport::TransportError;

/// Fixed user-facing text per status.
pub fn default_message(status: u16) -> &'static str {
    match status {
        0 => "Unable to reach the server. Check your connection and try again.",
        400 => "The request is invalid.",
        401 => "Your session has expired. Please sign in again.",
        403 => "You do not have permission to perform this action.",
        404 => "The requested resource was not found.",
        408 => "The request timed out.",
        409 => "The request conflicts with the current state of the resource.",
        422 => "The submitted data is invalid.",
        429 => "Too many requests. Please wait and try again.",
        500 => "An internal server error occurred.",
        502 => "An upstream service is unavailable.",
        503 => "The service is temporarily unavailable.",
        504 => "The server took too long to respond.",
        _ => "An unexpected error occurred.",
    }
}

/// Fields read from an error body. The backends produce `{code, message,
/// details}` or `{error, message}`; each field is read on its own so one
/// oddly typed field does not hide the others.
#[derive(Debug, Default)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<serde_json::Value>,
}

impl ErrorBody {
    fn parse(body: &[u8]) -> Self {
        let Ok(serde_json::Value::Object(mut fields)) = serde_json::from_slice::<serde_json::Value>(body) else {
            return Self::default();
        };

        let code = fields
            .get("code")
            .and_then(code_text)
            .or_else(|| fields.get("error").and_then(code_text));
        let message = fields
            .get("message")
            .and_then(serde_json::Value::as_str)
            .and_then(non_empty);

        Self {
            code,
            message,
            details: fields.remove("details").filter(|d| !d.is_null()),
        }
    }
}

/// String codes as-is, numeric codes rendered as text.
fn code_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => non_empty(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| s.to_string())
}

/// Normalize a failed dispatch.
///
/// Always yields a well-formed error, whatever the body contains.
pub fn translate(failure: &DispatchFailure) -> (AppError, RecoveryAction) {
    match failure {
        DispatchFailure::Transport(TransportError::Build(msg)) => (
            AppError::client("REQUEST_NOT_SENT", msg.clone()),
            RecoveryAction::None,
        ),
        DispatchFailure::Transport(e) => {
            tracing::debug!(error = %e, "transport failure");
            (AppError::transport(default_message(0)), RecoveryAction::None)
        }
        DispatchFailure::Status(resp) => {
            let status = resp.status;
            let ErrorBody {
                code,
                message,
                details,
            } = ErrorBody::parse(&resp.body);

            let mut error = AppError::server(
                status,
                code.unwrap_or_else(|| AppError::status_code(status)),
                message.unwrap_or_else(|| default_message(status).to_string()),
            );
            if let Some(details) = details {
                error = error.with_details(details);
            }

            (error, RecoveryAction::for_status(status))
        }
    }
}
