use thiserror::Error;

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Malformed lock for '{application_id}': {reason}")]
    MalformedLock { application_id: String, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Notice surface error: {0}")]
    Surface(String),
}

impl From<toml::de::Error> for AppError {
    fn from(e: toml::de::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_lock_message_names_application() {
        let err = AppError::MalformedLock {
            application_id: "com.example.game".into(),
            reason: "not a number".into(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed lock for 'com.example.game': not a number"
        );
    }

    #[test]
    fn test_toml_error_maps_to_config() {
        let parse: Result<toml::Value, _> = toml::from_str("= nope");
        let err = AppError::from(parse.unwrap_err());
        assert!(matches!(err, AppError::Config(_)));
    }
}
