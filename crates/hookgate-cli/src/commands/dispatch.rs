//! Dispatch command implementation

use anyhow::{Context, bail};
use hookgate_core::settings::ConfigStore;
use hookgate_core::{Decision, EventKind, EventPayload};
use serde_json::{Map, Value};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

/// Exit status when the aggregated decision blocks the event
const BLOCKED_EXIT_CODE: u8 = 2;

/// Arguments of one `hookgate dispatch` invocation
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub event: EventKind,
    pub subject: Option<String>,
    pub payload: Option<String>,
    pub session_id: Option<String>,
    pub cwd: Option<PathBuf>,
    pub detailed: bool,
}

/// Load configuration, dispatch the event and print the result
pub async fn execute(store: &ConfigStore, request: DispatchRequest) -> anyhow::Result<ExitCode> {
    let fields = match request.payload.as_deref() {
        Some(source) => read_fields(source)?,
        None => Map::new(),
    };
    let payload = build_payload(&request, fields)?;

    let loaded = store.load();
    for warning in &loaded.warnings {
        tracing::warn!("Skipped settings source: {}", warning);
    }
    let dispatcher = loaded.into_dispatcher();

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let report = dispatcher.dispatch_detailed(&payload, &cancel).await;
    watcher.abort();

    let output = if request.detailed {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string_pretty(&report.decision)
    }
    .context("Failed to serialize decision")?;
    println!("{}", output);

    Ok(ExitCode::from(exit_status(&report.decision)))
}

fn exit_status(decision: &Decision) -> u8 {
    if decision.is_blocking() {
        BLOCKED_EXIT_CODE
    } else {
        0
    }
}

fn read_fields(source: &str) -> anyhow::Result<Map<String, Value>> {
    let content = if source == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read payload from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read payload file: {}", source))?
    };
    parse_fields(&content)
}

fn parse_fields(content: &str) -> anyhow::Result<Map<String, Value>> {
    if content.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str(content).context("Payload is not valid JSON")? {
        Value::Object(fields) => Ok(fields),
        other => bail!("Payload must be a JSON object, got {}", type_name(&other)),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn build_payload(
    request: &DispatchRequest,
    fields: Map<String, Value>,
) -> anyhow::Result<EventPayload> {
    let event = request.event;
    let session_id = request
        .session_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    // An explicit subject wins; otherwise take it from the event's subject field.
    let subject = request.subject.clone().or_else(|| {
        event
            .subject_field()
            .and_then(|field| fields.get(field))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    if subject.is_some() && !event.has_subject() {
        bail!("{} events have no subject", event);
    }

    let mut payload = EventPayload::new(event, session_id);
    if let Some(cwd) = &request.cwd {
        payload = payload.with_cwd(cwd.clone());
    }
    if let Some(subject) = subject {
        payload = payload.with_subject(subject);
    }
    for (key, value) in fields {
        payload = payload.with_field(key, value);
    }
    Ok(payload)
}
