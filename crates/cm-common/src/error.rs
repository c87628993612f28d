//! The configuration error type.
//!
//! All failures raised by confmodel are a single kind carrying a
//! human-readable message. There are two canonical raise sites: field-scoped
//! problems ("Field '<name>' <problem>") and fallback references to names
//! absent from the schema ("Undefined fallback field: '<name>'"). Cross-field
//! validation hooks supply their own messages.

use thiserror::Error;

/// Result type alias for confmodel operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// A configuration validation or access error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    /// Create an error with a free-form message.
    pub fn new(message: impl Into<String>) -> Self {
        ConfigError {
            message: message.into(),
        }
    }

    /// Create a field-scoped error: "Field '<name>' <problem>".
    pub fn field(name: &str, problem: &str) -> Self {
        ConfigError {
            message: format!("Field '{name}' {problem}"),
        }
    }

    /// Create an error for a missing required field.
    pub fn missing_required(name: &str) -> Self {
        Self::field(name, "is required but no value is present.")
    }

    /// Create an error for a fallback referencing a name not in the schema.
    pub fn undefined_fallback(name: &str) -> Self {
        ConfigError {
            message: format!("Undefined fallback field: '{name}'"),
        }
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }
}
