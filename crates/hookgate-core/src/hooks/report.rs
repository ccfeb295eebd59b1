//! User-visible hook feedback
//!
//! Non-blocking hook failures and informational hook output never change a
//! decision, but the user should still see them. The dispatcher hands them to a
//! [`HookReporter`]; the default one logs through `tracing`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

use super::events::EventKind;
use crate::error::{HookExecutionError, MatcherError};

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    SpawnFailed,
    Timeout,
    NonZeroExit,
    Cancelled,
    Io,
    /// An in-process callback panicked
    Panicked,
    InvalidPattern,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::SpawnFailed => "spawn_failed",
            WarningKind::Timeout => "timeout",
            WarningKind::NonZeroExit => "non_zero_exit",
            WarningKind::Cancelled => "cancelled",
            WarningKind::Io => "io",
            WarningKind::Panicked => "panicked",
            WarningKind::InvalidPattern => "invalid_pattern",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&HookExecutionError> for WarningKind {
    fn from(error: &HookExecutionError) -> Self {
        match error {
            HookExecutionError::SpawnFailed { .. } => WarningKind::SpawnFailed,
            HookExecutionError::Timeout { .. } => WarningKind::Timeout,
            HookExecutionError::NonZeroExit { .. } => WarningKind::NonZeroExit,
            HookExecutionError::Cancelled { .. } => WarningKind::Cancelled,
            HookExecutionError::Io { .. } => WarningKind::Io,
        }
    }
}

/// One non-blocking problem encountered while dispatching an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookWarning {
    pub event: EventKind,
    /// Command line or callback name
    pub source: String,
    pub kind: WarningKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl HookWarning {
    pub fn new(
        event: EventKind,
        source: impl Into<String>,
        kind: WarningKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event,
            source: source.into(),
            kind,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn from_execution_error(
        event: EventKind,
        source: impl Into<String>,
        error: &HookExecutionError,
    ) -> Self {
        Self::new(event, source, WarningKind::from(error), error.to_string())
    }

    pub fn from_matcher_error(event: EventKind, error: &MatcherError) -> Self {
        let MatcherError::InvalidPattern { pattern, .. } = error;
        Self::new(
            event,
            pattern.clone(),
            WarningKind::InvalidPattern,
            error.to_string(),
        )
    }
}

impl fmt::Display for HookWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.event, self.kind, self.message)
    }
}

/// Receives hook feedback destined for the user
pub trait HookReporter: Send + Sync {
    /// A hook failed without blocking (timeout, crash, spawn failure, ...)
    fn warning(&self, warning: &HookWarning);

    /// A hook printed an informational message
    fn message(&self, event: EventKind, source: &str, text: &str);
}

/// Reporter that logs through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl HookReporter for TracingReporter {
    fn warning(&self, warning: &HookWarning) {
        warn!(
            event = %warning.event,
            source = %warning.source,
            kind = %warning.kind,
            "{}",
            warning.message
        );
    }

    fn message(&self, event: EventKind, source: &str, text: &str) {
        info!(event = %event, source = %source, "{}", text);
    }
}
