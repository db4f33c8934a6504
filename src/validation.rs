use crate::constants::{MAX_APPLICATION_ID_LEN, MAX_LOCK_MESSAGE_LEN};
use crate::error::AppError;

/// Validate an application identifier.
/// Returns the trimmed identifier if valid.
pub fn validate_application_id(application_id: &str) -> Result<&str, AppError> {
    let application_id = application_id.trim();
    if application_id.is_empty() {
        return Err(AppError::InvalidInput {
            field: "application_id",
            reason: "cannot be empty".into(),
        });
    }
    if application_id.len() > MAX_APPLICATION_ID_LEN {
        return Err(AppError::InvalidInput {
            field: "application_id",
            reason: format!("cannot exceed {MAX_APPLICATION_ID_LEN} characters"),
        });
    }
    if application_id.chars().any(char::is_control) {
        return Err(AppError::InvalidInput {
            field: "application_id",
            reason: "cannot contain control characters".into(),
        });
    }
    Ok(application_id)
}

/// Validate an optional custom lock message.
pub fn validate_lock_message(message: Option<&str>) -> Result<(), AppError> {
    if let Some(message) = message {
        if message.len() > MAX_LOCK_MESSAGE_LEN {
            return Err(AppError::InvalidInput {
                field: "message",
                reason: format!("cannot exceed {MAX_LOCK_MESSAGE_LEN} characters"),
            });
        }
    }
    Ok(())
}

/// Validate a lock expiry timestamp (epoch milliseconds).
pub fn validate_locked_until(locked_until_ms: i64) -> Result<(), AppError> {
    if locked_until_ms < 0 {
        return Err(AppError::InvalidInput {
            field: "locked_until",
            reason: "cannot be before the Unix epoch".into(),
        });
    }
    Ok(())
}
