//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration rejected after command-line overrides
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// Session could not start or finish
    #[error("Session failed: {message}")]
    Session { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = CliError::config_not_found("missing.toml");
        assert_eq!(err.to_string(), "Configuration file not found: missing.toml");

        let err = CliError::session("no compatible device");
        assert!(err.to_string().contains("no compatible device"));
    }
}
