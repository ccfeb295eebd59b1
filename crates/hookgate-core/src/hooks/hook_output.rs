//! Hook decision types
//!
//! [`Decision`] is the only outcome type the rest of the engine sees. Its serde form
//! is the structured hook response protocol, so a decision parsed from a hook's stdout
//! serializes back to the same fields.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Verdict carried by a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Explicitly allow the action
    Allow,
    /// Prevent the action from running
    Deny,
    /// Ask the user before running the action
    Ask,
    /// Stop processing and surface the reason as blocking feedback
    Block,
    /// No opinion; continue as if the hook had not run
    #[default]
    Pass,
}

impl Verdict {
    /// Deny and Block are the blocking verdicts
    pub fn is_blocking(&self) -> bool {
        matches!(self, Verdict::Deny | Verdict::Block)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Allow => write!(f, "allow"),
            Verdict::Deny => write!(f, "deny"),
            Verdict::Ask => write!(f, "ask"),
            Verdict::Block => write!(f, "block"),
            Verdict::Pass => write!(f, "pass"),
        }
    }
}

/// Outcome of one hook, or of all hooks matched to one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    #[serde(rename = "decision", default)]
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
    #[serde(rename = "continue", default = "default_continue")]
    pub continue_session: bool,
    #[serde(default)]
    pub suppress_output: bool,
}

pub(crate) fn default_continue() -> bool {
    true
}

impl Default for Decision {
    fn default() -> Self {
        Self {
            verdict: Verdict::Pass,
            reason: None,
            additional_context: None,
            continue_session: true,
            suppress_output: false,
        }
    }
}

impl Decision {
    /// Pass with no message
    pub fn pass() -> Self {
        Self::default()
    }

    /// Pass with an informational message
    pub fn pass_with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Explicit allow
    pub fn allow() -> Self {
        Self {
            verdict: Verdict::Allow,
            ..Default::default()
        }
    }

    /// Deny the action
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Deny,
            reason: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Ask the user for confirmation
    pub fn ask(reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Ask,
            reason: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Block with feedback
    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Block,
            reason: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Blocking decision with the given verdict
    pub(crate) fn blocking(verdict: Verdict, reason: impl Into<String>) -> Self {
        Self {
            verdict,
            reason: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Request that the agent session stops
    pub fn stop_session(mut self, reason: impl Into<String>) -> Self {
        self.continue_session = false;
        if self.reason.as_deref().is_none_or(str::is_empty) {
            self.reason = Some(reason.into());
        }
        self
    }

    /// Attach additional context for the reasoning step
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.additional_context = Some(context.into());
        self
    }

    /// Set the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Suppress the action output from the transcript
    pub fn with_suppressed_output(mut self) -> Self {
        self.suppress_output = true;
        self
    }

    /// Whether this decision blocks the action (Deny or Block)
    pub fn is_blocking(&self) -> bool {
        self.verdict.is_blocking()
    }

    /// Check the structural invariants every emitted decision must hold
    pub fn check_invariants(&self) -> Result<(), String> {
        let has_reason = self.reason.as_deref().is_some_and(|r| !r.trim().is_empty());
        if self.verdict.is_blocking() && !has_reason {
            return Err(format!("{} decision without a reason", self.verdict));
        }
        if !self.continue_session && !has_reason {
            return Err("session stop requested without a reason".to_string());
        }
        Ok(())
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Verdict: {}", self.verdict)?;
        if let Some(reason) = &self.reason {
            write!(f, ", Reason: {}", reason)?;
        }
        if !self.continue_session {
            write!(f, ", Stop session")?;
        }
        if self.suppress_output {
            write!(f, ", Suppress output")?;
        }
        Ok(())
    }
}
