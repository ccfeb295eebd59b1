//! Hook input payload
//!
//! The payload is written to each hook's stdin as one JSON object followed by a
//! newline. The canonical keys (`session_id`, `cwd`, `hook_event_name`, `subject`)
//! always win over event-specific fields with the same name.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

use super::events::EventKind;
use crate::error::HookgateResult;

const RESERVED_KEYS: &[&str] = &["session_id", "cwd", "hook_event_name", "subject"];

/// Input describing one intercepted event
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawEventPayload")]
pub struct EventPayload {
    pub session_id: String,
    pub cwd: PathBuf,
    pub event: EventKind,
    /// Tool name for action events, absent for prompt events
    pub subject: Option<String>,
    /// Event-specific fields such as `tool_input`, `tool_response` or `prompt`
    pub fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawEventPayload {
    session_id: String,
    cwd: PathBuf,
    hook_event_name: EventKind,
    #[serde(default)]
    subject: Option<String>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl From<RawEventPayload> for EventPayload {
    fn from(raw: RawEventPayload) -> Self {
        Self {
            session_id: raw.session_id,
            cwd: raw.cwd,
            event: raw.hook_event_name,
            subject: raw.subject,
            fields: raw.fields,
        }
    }
}

impl EventPayload {
    /// Create a new payload rooted at the process working directory
    pub fn new(event: EventKind, session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            event,
            subject: None,
            fields: Map::new(),
        }
    }

    /// Payload for a tool call about to run
    pub fn pre_action(
        session_id: impl Into<String>,
        tool_name: impl Into<String>,
        tool_input: Value,
    ) -> Self {
        Self::new(EventKind::PreAction, session_id)
            .with_subject(tool_name)
            .with_field("tool_input", tool_input)
    }

    /// Payload for a tool call that has completed
    pub fn post_action(
        session_id: impl Into<String>,
        tool_name: impl Into<String>,
        tool_input: Value,
        tool_response: Value,
    ) -> Self {
        Self::new(EventKind::PostAction, session_id)
            .with_subject(tool_name)
            .with_field("tool_input", tool_input)
            .with_field("tool_response", tool_response)
    }

    /// Payload for a tool call that failed
    pub fn post_action_failure(
        session_id: impl Into<String>,
        tool_name: impl Into<String>,
        tool_input: Value,
        error: impl Into<String>,
    ) -> Self {
        Self::new(EventKind::PostActionFailure, session_id)
            .with_subject(tool_name)
            .with_field("tool_input", tool_input)
            .with_field("error", Value::String(error.into()))
    }

    /// Payload for a submitted user prompt
    pub fn prompt_submit(session_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(EventKind::PromptSubmit, session_id)
            .with_field("prompt", Value::String(prompt.into()))
    }

    /// Set the current working directory
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    /// Set the subject (tool name)
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Add an event-specific field
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Look up an event-specific field
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Canonical stdin form: one JSON object, newline-terminated
    pub fn to_json_line(&self) -> HookgateResult<Vec<u8>> {
        let mut bytes = serde_json::to_vec(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

impl Serialize for EventPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("session_id", &self.session_id)?;
        map.serialize_entry("cwd", &self.cwd)?;
        map.serialize_entry("hook_event_name", &self.event)?;
        if let Some(subject) = &self.subject {
            map.serialize_entry("subject", subject)?;
        }
        for (key, value) in &self.fields {
            if !RESERVED_KEYS.contains(&key.as_str()) {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

impl fmt::Display for EventPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Event: {}, Session: {}, Subject: {:?}",
            self.event, self.session_id, self.subject
        )
    }
}
