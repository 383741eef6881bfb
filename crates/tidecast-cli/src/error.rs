use std::path::PathBuf;

use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] tidecast_core::ValidationError),

    #[error(transparent)]
    Config(#[from] tidecast_core::ConfigError),

    #[error("{}", .0.user_message())]
    Api(#[from] tidecast_core::ApiError),

    #[error("{path}: {source}")]
    Csv {
        path: PathBuf,
        source: tidecast_core::CsvParseError,
    },

    #[error("command error: {0}")]
    Command(String),

    #[error("strict mode failed: warnings={warning_count}")]
    StrictModeViolation { warning_count: usize },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Config(_) | Self::Csv { .. } | Self::Command(_) => 2,
            Self::Api(_) => 3,
            Self::Serialization(_) => 4,
            Self::StrictModeViolation { .. } => 5,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use tidecast_core::{map_status, ApiError, ValidationError};

    use super::*;

    #[test]
    fn api_errors_render_user_messages() {
        let error = CliError::from(map_status(422, r#"{"detail": "horizon too large"}"#));
        assert_eq!(
            error.to_string(),
            "The service rejected the request: horizon too large"
        );
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn exit_codes_follow_categories() {
        assert_eq!(CliError::from(ValidationError::EmptyFrequency).exit_code(), 2);
        assert_eq!(
            CliError::from(ApiError::Timeout { timeout_ms: 10 }).exit_code(),
            3
        );
        assert_eq!(
            CliError::StrictModeViolation { warning_count: 1 }.exit_code(),
            5
        );
    }
}
