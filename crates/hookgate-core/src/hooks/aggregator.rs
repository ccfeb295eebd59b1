//! Decision aggregation
//!
//! Combines the per-hook decisions for one event into a single decision. The input
//! is in merge order (configuration order, then callbacks), never completion order,
//! so the outcome does not depend on which hook finished first.
//!
//! Precedence:
//! 1. the first Deny/Block wins, with its reason and context
//! 2. else the first Ask wins
//! 3. else Pass, carrying every `additionalContext` joined by newlines
//!
//! Independently of the verdict, any hook asking to stop the session stops it, and
//! `suppressOutput` is OR-ed across hooks.

use tracing::debug;

use super::events::EventKind;
use super::hook_output::{Decision, Verdict};

const STOP_REASON: &str = "a hook requested the session to stop";

/// Aggregate `decisions` (in merge order) for `event`
pub fn aggregate(event: EventKind, decisions: &[Decision]) -> Decision {
    let verdict_of = |decision: &Decision| event.normalize(decision.verdict);

    let mut result = if let Some(winner) = decisions.iter().find(|d| verdict_of(d).is_blocking()) {
        let mut winner = winner.clone();
        winner.verdict = verdict_of(&winner);
        if winner.reason.as_deref().is_none_or(|r| r.trim().is_empty()) {
            winner.reason = Some(format!("{} by hook", winner.verdict));
        }
        winner
    } else if let Some(ask) = decisions.iter().find(|d| verdict_of(d) == Verdict::Ask) {
        ask.clone()
    } else {
        let contexts: Vec<&str> = decisions
            .iter()
            .filter_map(|d| d.additional_context.as_deref())
            .filter(|c| !c.is_empty())
            .collect();
        Decision {
            additional_context: (!contexts.is_empty()).then(|| contexts.join("\n")),
            ..Decision::pass()
        }
    };

    result.suppress_output = decisions.iter().any(|d| d.suppress_output);

    if let Some(stopper) = decisions.iter().find(|d| !d.continue_session) {
        result.continue_session = false;
        if result.reason.as_deref().is_none_or(|r| r.trim().is_empty()) {
            let reason = stopper
                .reason
                .clone()
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| STOP_REASON.to_string());
            result.reason = Some(reason);
        }
    } else {
        result.continue_session = true;
    }

    debug!(
        "Aggregated {} decision(s) for {}: {}",
        decisions.len(),
        event,
        result
    );
    result
}
