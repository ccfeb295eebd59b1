//! Hook output interpretation
//!
//! Turns a finished [`HookExecutionResult`] into the canonical [`Decision`]. This is the
//! only place that knows about the exit-code protocol and the JSON response shape.
//!
//! | Outcome                    | Decision                                    |
//! |----------------------------|---------------------------------------------|
//! | timed out                  | Pass, "hook timed out"                      |
//! | exit 0, empty stdout       | Pass                                        |
//! | exit 0, JSON object stdout | structured response                         |
//! | exit 0, other stdout       | Pass, stdout as reason                      |
//! | exit 2                     | event's blocking verdict, stderr as reason  |
//! | any other exit             | Pass, stderr as reason                      |

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::events::EventKind;
use super::hook_output::{Decision, Verdict};
use super::process::HookExecutionResult;

/// Exit code a hook uses to deny or block
pub const BLOCKING_EXIT_CODE: i32 = 2;

pub const TIMED_OUT_REASON: &str = "hook timed out";

/// Structured response a hook may print on stdout
///
/// Fields are kept loose so that a slightly wrong response degrades field by field
/// instead of being discarded.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookResponse {
    #[serde(default)]
    pub decision: Option<Value>,
    #[serde(default)]
    pub reason: Option<String>,
    /// Older name for `reason`
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub additional_context: Option<Value>,
    #[serde(rename = "continue", default)]
    pub continue_session: Option<Value>,
    #[serde(default)]
    pub suppress_output: Option<Value>,
}

impl HookResponse {
    /// Parse stdout as a response. Only JSON objects qualify.
    pub fn parse(stdout: &str) -> Option<Self> {
        let trimmed = stdout.trim();
        if !trimmed.starts_with('{') {
            return None;
        }
        serde_json::from_str(trimmed).ok()
    }

    /// Resolve into a decision using `event`'s vocabulary
    pub fn into_decision(self, event: EventKind) -> Decision {
        let reported = match self.decision {
            None | Some(Value::Null) => Verdict::Allow,
            Some(value) => serde_json::from_value::<Verdict>(value.clone()).unwrap_or_else(|_| {
                warn!("Invalid decision value {}, defaulting to allow", value);
                Verdict::Allow
            }),
        };
        let verdict = event.normalize(reported);
        if reported == Verdict::Ask && verdict != Verdict::Ask {
            warn!("'ask' is not supported for {} hooks; treating as pass", event);
        }

        let reason = non_empty(self.reason).or_else(|| non_empty(self.stop_reason));
        let additional_context = match self.additional_context {
            None | Some(Value::Null) => None,
            Some(Value::String(context)) => Some(context),
            Some(other) => Some(other.to_string()),
        };
        let continue_session = lenient_bool(self.continue_session, "continue", true);
        let suppress_output = lenient_bool(self.suppress_output, "suppressOutput", false);

        let mut decision = Decision {
            verdict,
            reason,
            additional_context,
            continue_session,
            suppress_output,
        };

        if matches!(verdict, Verdict::Deny | Verdict::Block | Verdict::Ask) && decision.reason.is_none() {
            warn!("Hook returned {} without a reason, using default", verdict);
            decision.reason = Some(format!("hook returned {} decision without a reason", verdict));
        }
        if !decision.continue_session && decision.reason.is_none() {
            decision.reason = Some("hook requested the session to stop".to_string());
        }
        decision
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn lenient_bool(value: Option<Value>, field: &str, default: bool) -> bool {
    match value {
        None | Some(Value::Null) => default,
        Some(Value::Bool(b)) => b,
        Some(other) => {
            warn!("Invalid {} value {}, defaulting to {}", field, other, default);
            default
        }
    }
}

/// Interpret one hook's raw result for `event`
///
/// Pure: performs no I/O beyond the JSON parse.
pub fn interpret(event: EventKind, result: &HookExecutionResult) -> Decision {
    if result.timed_out {
        return Decision::pass_with_reason(TIMED_OUT_REASON);
    }

    let stdout = result.stdout_text();
    let stdout = stdout.trim();
    let stderr = result.stderr_text();
    let stderr = stderr.trim();

    match result.exit_code {
        0 => {
            if stdout.is_empty() {
                Decision::pass()
            } else if let Some(response) = HookResponse::parse(stdout) {
                response.into_decision(event)
            } else {
                Decision::pass_with_reason(stdout)
            }
        }
        BLOCKING_EXIT_CODE => {
            let reason = [stderr, stdout]
                .into_iter()
                .find(|text| !text.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("{} hook blocked without a message", event));
            Decision::blocking(event.blocking_verdict(), reason)
        }
        code => {
            if stderr.is_empty() {
                Decision::pass_with_reason(format!("hook exited with status {}", code))
            } else {
                Decision::pass_with_reason(stderr)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn exited(code: i32, stdout: &str, stderr: &str) -> HookExecutionResult {
        HookExecutionResult::exited(code, stdout, stderr)
    }

    #[test]
    fn test_timeout_is_pass() {
        let result = HookExecutionResult::timed_out(Duration::from_secs(3));
        let decision = interpret(EventKind::PreAction, &result);
        assert_eq!(decision.verdict, Verdict::Pass);
        assert_eq!(decision.reason.as_deref(), Some("hook timed out"));
        assert!(decision.continue_session);
    }

    #[test]
    fn test_exit_zero_empty_stdout() {
        let decision = interpret(EventKind::PreAction, &exited(0, "  \n", "ignored"));
        assert_eq!(decision, Decision::pass());
    }

    #[test]
    fn test_exit_zero_plain_text() {
        let decision = interpret(EventKind::PostAction, &exited(0, "formatted 3 files\n", ""));
        assert_eq!(decision.verdict, Verdict::Pass);
        assert_eq!(decision.reason.as_deref(), Some("formatted 3 files"));
    }

    #[test]
    fn test_exit_zero_malformed_json_is_plain_text() {
        let decision = interpret(EventKind::PreAction, &exited(0, "{not json", ""));
        assert_eq!(decision.verdict, Verdict::Pass);
        assert_eq!(decision.reason.as_deref(), Some("{not json"));
    }

    #[test]
    fn test_exit_zero_structured() {
        let stdout = r#"{"decision":"deny","reason":"no writes to /etc","suppressOutput":true}"#;
        let decision = interpret(EventKind::PreAction, &exited(0, stdout, ""));
        assert_eq!(decision.verdict, Verdict::Deny);
        assert_eq!(decision.reason.as_deref(), Some("no writes to /etc"));
        assert!(decision.suppress_output);
        assert!(decision.continue_session);
    }

    #[test]
    fn test_missing_decision_defaults_to_allow() {
        let decision = interpret(
            EventKind::PromptSubmit,
            &exited(0, r#"{"additionalContext":"time: 10:00"}"#, ""),
        );
        assert_eq!(decision.verdict, Verdict::Allow);
        assert_eq!(decision.additional_context.as_deref(), Some("time: 10:00"));
    }

    #[test]
    fn test_invalid_decision_defaults_to_allow() {
        let stdout = r#"{"decision":"maybe","reason":"unsure"}"#;
        let decision = interpret(EventKind::PreAction, &exited(0, stdout, ""));
        assert_eq!(decision.verdict, Verdict::Allow);
        assert_eq!(decision.reason.as_deref(), Some("unsure"));
    }

    #[test]
    fn test_stop_reason_fallback_and_default_reasons() {
        let stdout = r#"{"decision":"block","stopReason":"tests failing"}"#;
        let decision = interpret(EventKind::PostAction, &exited(0, stdout, ""));
        assert_eq!(decision.verdict, Verdict::Block);
        assert_eq!(decision.reason.as_deref(), Some("tests failing"));

        let decision = interpret(EventKind::PreAction, &exited(0, r#"{"decision":"ask"}"#, ""));
        assert_eq!(decision.verdict, Verdict::Ask);
        assert!(decision.check_invariants().is_ok());

        let decision = interpret(EventKind::PostAction, &exited(0, r#"{"continue":false}"#, ""));
        assert!(!decision.continue_session);
        assert!(decision.check_invariants().is_ok());
    }

    #[test]
    fn test_vocabulary_normalized_per_event() {
        let decision = interpret(
            EventKind::PreAction,
            &exited(0, r#"{"decision":"block","reason":"r"}"#, ""),
        );
        assert_eq!(decision.verdict, Verdict::Deny);

        let decision = interpret(
            EventKind::PostAction,
            &exited(0, r#"{"decision":"deny","reason":"r"}"#, ""),
        );
        assert_eq!(decision.verdict, Verdict::Block);

        let decision = interpret(
            EventKind::PromptSubmit,
            &exited(0, r#"{"decision":"ask","reason":"r"}"#, ""),
        );
        assert_eq!(decision.verdict, Verdict::Pass);
    }

    #[test]
    fn test_lenient_fields() {
        let stdout = r#"{"additionalContext":{"files":2},"continue":"yes","suppressOutput":1}"#;
        let decision = interpret(EventKind::PostAction, &exited(0, stdout, ""));
        assert_eq!(decision.additional_context.as_deref(), Some(r#"{"files":2}"#));
        assert!(decision.continue_session);
        assert!(!decision.suppress_output);
    }

    #[test]
    fn test_exit_two_blocks_per_event() {
        let decision = interpret(EventKind::PreAction, &exited(2, "", "blocked\n"));
        assert_eq!(decision.verdict, Verdict::Deny);
        assert_eq!(decision.reason.as_deref(), Some("blocked"));

        let decision = interpret(EventKind::PostAction, &exited(2, "", "lint failed"));
        assert_eq!(decision.verdict, Verdict::Block);

        let decision = interpret(EventKind::PromptSubmit, &exited(2, "", "secret in prompt"));
        assert_eq!(decision.verdict, Verdict::Block);
    }

    #[test]
    fn test_exit_two_reason_fallbacks() {
        let decision = interpret(EventKind::PreAction, &exited(2, "from stdout", ""));
        assert_eq!(decision.reason.as_deref(), Some("from stdout"));

        let decision = interpret(EventKind::PreAction, &exited(2, "", ""));
        assert!(decision.check_invariants().is_ok());
    }

    #[test]
    fn test_other_exit_codes_are_non_blocking() {
        let decision = interpret(EventKind::PreAction, &exited(1, "", "crashed"));
        assert_eq!(decision.verdict, Verdict::Pass);
        assert_eq!(decision.reason.as_deref(), Some("crashed"));

        let decision = interpret(EventKind::PreAction, &exited(127, "", ""));
        assert_eq!(decision.reason.as_deref(), Some("hook exited with status 127"));
    }

    #[test]
    fn test_parsed_decision_reserializes_set_fields() {
        let stdout = r#"{"decision":"deny","reason":"nope","additionalContext":"ctx","continue":false,"suppressOutput":true}"#;
        let decision = interpret(EventKind::PreAction, &exited(0, stdout, ""));
        let original: Value = serde_json::from_str(stdout).unwrap();
        assert_eq!(serde_json::to_value(&decision).unwrap(), original);
    }
}
