//! Error types for hookgate
//!
//! Configuration, matcher and hook execution errors are all non-fatal: they are
//! resolved where they occur and surface as warnings. Only [`HookgateError::Invariant`]
//! aborts, and only while a [`HookConfigTable`](crate::hooks::HookConfigTable) is being
//! assembled at startup.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for hookgate operations
pub type HookgateResult<T> = Result<T, HookgateError>;

/// Main error type for hookgate
#[derive(Error, Debug, Clone)]
pub enum HookgateError {
    /// Internal invariant violated while building engine state
    #[error("Invariant violation: {0}")]
    Invariant(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),
}

impl HookgateError {
    /// Create a new invariant violation
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant(message.into())
    }
}

impl From<serde_json::Error> for HookgateError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}

/// Per-source configuration failure. The source is skipped, loading continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("settings file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("malformed JSON in {}: {message}", path.display())]
    MalformedJson { path: PathBuf, message: String },

    #[error("invalid hook configuration in {}: {message}", path.display())]
    SchemaInvalid { path: PathBuf, message: String },

    #[error("failed to read {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

impl ConfigError {
    /// Path of the source that failed
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::NotFound { path }
            | ConfigError::MalformedJson { path, .. }
            | ConfigError::SchemaInvalid { path, .. }
            | ConfigError::Io { path, .. } => path,
        }
    }

    /// Short machine-friendly kind label
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigError::NotFound { .. } => "not_found",
            ConfigError::MalformedJson { .. } => "malformed_json",
            ConfigError::SchemaInvalid { .. } => "schema_invalid",
            ConfigError::Io { .. } => "io",
        }
    }
}

/// A matcher pattern that cannot be compiled. Treated as a non-match.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatcherError {
    #[error("invalid matcher pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Failure of a single hook invocation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HookExecutionError {
    #[error("failed to spawn '{command}': {message}")]
    SpawnFailed { command: String, message: String },

    #[error("'{command}' timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },

    #[error("'{command}' exited with status {code}: {stderr}")]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("'{command}' was cancelled")]
    Cancelled { command: String },

    #[error("I/O failure while running '{command}': {message}")]
    Io { command: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display_and_kind() {
        let err = ConfigError::MalformedJson {
            path: PathBuf::from("/tmp/settings.json"),
            message: "expected value".to_string(),
        };
        assert_eq!(err.kind(), "malformed_json");
        assert!(err.to_string().contains("/tmp/settings.json"));
        assert!(err.to_string().contains("expected value"));
        assert_eq!(err.path(), &PathBuf::from("/tmp/settings.json"));
    }

    #[test]
    fn test_execution_error_display() {
        let err = HookExecutionError::Timeout {
            command: "guard.sh".to_string(),
            timeout_secs: 5,
        };
        assert!(err.to_string().starts_with("'guard.sh'"));
        assert!(err.to_string().contains("timed out after 5s"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: HookgateError = json.into();
        assert!(matches!(err, HookgateError::Json(_)));
    }
}
