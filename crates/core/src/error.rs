//! Error types for avd-runner
//!
//! Input and configuration failures. Process failures live in
//! [`crate::process`], next to the runner that produces them.

use std::path::PathBuf;
use thiserror::Error;

/// An input value violated its allow-list or pattern.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Value for input.{field} '{value}' is not valid. Expected {expected}.")]
pub struct ValidationError {
    /// Input name, e.g. `arch` or `force-avd-creation`
    pub field: &'static str,
    /// The rejected value
    pub value: String,
    /// Human-readable description of the accepted values
    pub expected: String,
}

impl ValidationError {
    pub fn new(field: &'static str, value: &str, expected: impl Into<String>) -> Self {
        Self {
            field,
            value: value.to_string(),
            expected: expected.into(),
        }
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Invalid(String),
}

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_field_and_value() {
        let err = ValidationError::new("arch", "mips", "one of: x86, x86_64, arm64-v8a");
        let msg = err.to_string();
        assert!(msg.contains("input.arch"));
        assert!(msg.contains("'mips'"));
        assert!(msg.contains("x86_64"));
    }
}
