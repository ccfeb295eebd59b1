//! Hook event kinds
//!
//! Defines the lifecycle points that can trigger hook execution, which payload field
//! is matched against, and which verdicts each kind understands.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::hook_output::Verdict;

/// Lifecycle events that can trigger hook execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    /// Before an action (tool call) runs
    PreAction,
    /// After an action completed successfully
    PostAction,
    /// After an action failed
    PostActionFailure,
    /// User submits a prompt
    PromptSubmit,
}

impl EventKind {
    /// Name of the payload field that carries the subject, if the kind has one
    pub fn subject_field(&self) -> Option<&'static str> {
        match self {
            EventKind::PreAction | EventKind::PostAction | EventKind::PostActionFailure => {
                Some("tool_name")
            }
            EventKind::PromptSubmit => None,
        }
    }

    /// Whether events of this kind carry a subject to match against
    pub fn has_subject(&self) -> bool {
        self.subject_field().is_some()
    }

    /// Get a human-readable description of this event
    pub fn description(&self) -> &'static str {
        match self {
            EventKind::PreAction => "Before action execution",
            EventKind::PostAction => "After successful action execution",
            EventKind::PostActionFailure => "After failed action execution",
            EventKind::PromptSubmit => "User submits a prompt",
        }
    }

    /// Verdict produced by the blocking exit code for this kind
    ///
    /// Before the action it can still be prevented, so the hook denies it.
    /// Afterwards (or for prompts) the hook can only block further processing.
    pub fn blocking_verdict(&self) -> Verdict {
        match self {
            EventKind::PreAction => Verdict::Deny,
            EventKind::PostAction | EventKind::PostActionFailure | EventKind::PromptSubmit => {
                Verdict::Block
            }
        }
    }

    /// Map a verdict reported by a hook onto this kind's vocabulary
    pub fn normalize(&self, verdict: Verdict) -> Verdict {
        match (self, verdict) {
            (EventKind::PreAction, Verdict::Block) => Verdict::Deny,
            (EventKind::PreAction, other) => other,
            (_, Verdict::Deny) => Verdict::Block,
            (_, Verdict::Ask) => Verdict::Pass,
            (_, other) => other,
        }
    }

    /// Returns all possible event kinds
    pub fn all() -> &'static [EventKind] {
        &[
            EventKind::PreAction,
            EventKind::PostAction,
            EventKind::PostActionFailure,
            EventKind::PromptSubmit,
        ]
    }

    /// Canonical wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PreAction => "PreAction",
            EventKind::PostAction => "PostAction",
            EventKind::PostActionFailure => "PostActionFailure",
            EventKind::PromptSubmit => "PromptSubmit",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown hook event '{}'", s))
    }
}
