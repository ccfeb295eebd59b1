//! Hookgate Core Library
//!
//! This crate provides the hook dispatch engine: it loads hook configuration from
//! the settings hierarchy, matches configured hooks against agent lifecycle events,
//! runs them as sandboxed subprocesses and resolves their outputs into one
//! enforceable decision per event.

pub mod error;
pub mod hooks;
pub mod settings;

// Re-export commonly used types
pub use error::{ConfigError, HookExecutionError, HookgateError, HookgateResult, MatcherError};
pub use hooks::{
    CallbackHook, Decision, DispatchOptions, DispatchReport, EventDispatcher, EventKind,
    EventPayload, HookCommand, HookConfigTable, HookEntry, HookExecutionResult, HookProcess,
    HookReporter, HookStatistics, Verdict,
};
pub use settings::{ConfigSource, ConfigStore, LoadedConfig, SettingsLocations, SettingsSource};
