//! In-process callback hooks

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use super::command_hook::default_timeout;
use super::hook_input::EventPayload;
use super::hook_output::Decision;
use super::matcher::PatternMatcher;

/// Rust closure registered as a hook
///
/// Callbacks see the same payload as command hooks. The dispatcher runs them on the
/// blocking pool next to the command hooks, under their own timeout, and aggregates
/// them after all configured commands, in registration order.
pub struct CallbackHook {
    pub name: String,
    matcher: PatternMatcher,
    pub timeout_secs: u64,
    pub callback: Arc<dyn Fn(&EventPayload) -> Decision + Send + Sync>,
}

impl CallbackHook {
    /// Create a callback that applies to every subject
    pub fn new<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&EventPayload) -> Decision + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            matcher: PatternMatcher::Any,
            timeout_secs: default_timeout(),
            callback: Arc::new(callback),
        }
    }

    /// Set the timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Restrict the callback to subjects matching `pattern`
    pub fn with_matcher(mut self, pattern: &str) -> Self {
        self.matcher = PatternMatcher::compile(Some(pattern).filter(|p| !p.is_empty()));
        self
    }

    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    pub fn matches(&self, subject: Option<&str>) -> bool {
        self.matcher.matches(subject)
    }

    /// Run the callback. A panic becomes a Pass carrying the panic message.
    pub fn call(&self, payload: &EventPayload) -> Decision {
        self.try_call(payload).unwrap_or_else(Decision::pass_with_reason)
    }

    /// Run the callback, returning the panic description if it panicked
    pub(crate) fn try_call(&self, payload: &EventPayload) -> Result<Decision, String> {
        catch_unwind(AssertUnwindSafe(|| (self.callback)(payload))).map_err(|panic| {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            format!("callback hook '{}' panicked: {}", self.name, message)
        })
    }
}

impl Clone for CallbackHook {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            matcher: self.matcher.clone(),
            timeout_secs: self.timeout_secs,
            callback: Arc::clone(&self.callback),
        }
    }
}

impl fmt::Debug for CallbackHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackHook")
            .field("name", &self.name)
            .field("pattern", &self.matcher.pattern())
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
