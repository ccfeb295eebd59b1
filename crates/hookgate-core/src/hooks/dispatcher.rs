//! Event dispatching
//!
//! [`EventDispatcher`] is the entry point the agent runtime calls for every
//! intercepted event. One dispatch walks through
//! `Idle → CollectingMatches → Executing → Aggregating → Done`:
//!
//! 1. collect the commands (and callbacks) whose matcher accepts the subject
//! 2. run every matched command and callback concurrently, each bounded by its own
//!    timeout; callbacks run on the blocking pool
//! 3. interpret each result and aggregate the decisions in merge order
//!
//! A callback that outlives its timeout is abandoned: its decision becomes Pass and
//! the closure keeps its blocking thread until it returns.
//!
//! A dispatch always ends with exactly one [`Decision`]; hook failures degrade to
//! Pass and are reported, never propagated.

use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::aggregator::aggregate;
use super::callback_hook::CallbackHook;
use super::command_hook::HookCommand;
use super::events::EventKind;
use super::hook_config::HookConfigTable;
use super::hook_input::EventPayload;
use super::hook_output::{Decision, Verdict};
use super::interpreter::{interpret, TIMED_OUT_REASON};
use super::process::{HookExecutionResult, HookProcess, ProcessOptions};
use super::report::{HookReporter, HookWarning, TracingReporter, WarningKind};
use super::stats::{HookStatistics, StatsRecorder};
use crate::error::HookExecutionError;

/// Reason carried by the decision of a cancelled dispatch
pub const CANCELLED_REASON: &str = "hook dispatch cancelled";

/// Dispatcher tunables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Maximum hooks running at once for one event; `None` is unbounded
    pub max_concurrency: Option<usize>,
    pub process: ProcessOptions,
}

/// Phase of a single dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DispatchState {
    Idle,
    CollectingMatches,
    Executing,
    Aggregating,
    Done,
}

/// What happened to one matched hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookRun {
    /// Command line or callback name
    pub source: String,
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full account of one dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub event: EventKind,
    pub decision: Decision,
    /// One run per matched hook, in merge order
    pub runs: Vec<HookRun>,
    /// States visited, in order
    pub states: Vec<DispatchState>,
    pub cancelled: bool,
}

/// Runs configured hooks for events and resolves their decisions
pub struct EventDispatcher {
    table: RwLock<Arc<HookConfigTable>>,
    callbacks: RwLock<Vec<(EventKind, CallbackHook)>>,
    process: HookProcess,
    max_concurrency: Option<usize>,
    reporter: Arc<dyn HookReporter>,
    stats: StatsRecorder,
}

impl EventDispatcher {
    /// Create a dispatcher with default options
    pub fn new(table: HookConfigTable) -> Self {
        Self::with_options(table, DispatchOptions::default())
    }

    /// Create a dispatcher with the given options
    pub fn with_options(table: HookConfigTable, options: DispatchOptions) -> Self {
        let dispatcher = Self {
            table: RwLock::new(Arc::new(HookConfigTable::empty())),
            callbacks: RwLock::new(Vec::new()),
            process: HookProcess::new(options.process),
            max_concurrency: options.max_concurrency,
            reporter: Arc::new(TracingReporter),
            stats: StatsRecorder::default(),
        };
        dispatcher.replace_table(table);
        dispatcher
    }

    /// Use a custom reporter for user-visible feedback
    pub fn with_reporter(mut self, reporter: Arc<dyn HookReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Current configuration table
    pub fn table(&self) -> Arc<HookConfigTable> {
        self.table.read().clone()
    }

    /// Swap in a new table. Dispatches already running keep the old one.
    pub fn replace_table(&self, table: HookConfigTable) {
        for event in table.events() {
            for entry in table.entries(event) {
                if let Some(err) = entry.matcher().error() {
                    self.warn(HookWarning::from_matcher_error(event, err));
                }
            }
        }
        info!(
            "Installed hook table: {} command(s) across {} event(s)",
            table.command_count(),
            table.events().len()
        );
        *self.table.write() = Arc::new(table);
    }

    /// Register an in-process hook for `event`
    pub fn register_callback(&self, event: EventKind, hook: CallbackHook) {
        debug!("Registered callback hook '{}' for {}", hook.name, event);
        self.callbacks.write().push((event, hook));
    }

    /// Remove the callbacks named `name` from `event`. Returns whether any was removed.
    pub fn unregister_callback(&self, event: EventKind, name: &str) -> bool {
        let mut callbacks = self.callbacks.write();
        let before = callbacks.len();
        callbacks.retain(|(kind, hook)| !(*kind == event && hook.name == name));
        let removed = callbacks.len() != before;
        if removed {
            debug!("Unregistered callback hook '{}' for {}", name, event);
        }
        removed
    }

    /// Registered callbacks in registration order, optionally only those for `event`
    pub fn callbacks(&self, event: Option<EventKind>) -> Vec<(EventKind, CallbackHook)> {
        self.callbacks
            .read()
            .iter()
            .filter(|(kind, _)| event.is_none_or(|e| e == *kind))
            .cloned()
            .collect()
    }

    /// Remove every callback, or only those for `event`. Returns how many were removed.
    pub fn clear_callbacks(&self, event: Option<EventKind>) -> usize {
        let mut callbacks = self.callbacks.write();
        let before = callbacks.len();
        callbacks.retain(|(kind, _)| event.is_some_and(|e| e != *kind));
        let removed = before - callbacks.len();
        debug!("Cleared {} callback hook(s)", removed);
        removed
    }

    /// Snapshot of the error statistics
    pub fn statistics(&self) -> HookStatistics {
        self.stats.snapshot()
    }

    pub fn reset_statistics(&self) {
        self.stats.reset();
    }

    /// Dispatch an event and return the aggregated decision
    pub async fn dispatch(&self, payload: &EventPayload) -> Decision {
        self.dispatch_detailed(payload, &CancellationToken::new())
            .await
            .decision
    }

    /// Dispatch an event, terminating all hooks if `cancel` fires
    pub async fn dispatch_with_cancel(
        &self,
        payload: &EventPayload,
        cancel: &CancellationToken,
    ) -> Decision {
        self.dispatch_detailed(payload, cancel).await.decision
    }

    /// Dispatch an event and return the per-hook details along with the decision
    pub async fn dispatch_detailed(
        &self,
        payload: &EventPayload,
        cancel: &CancellationToken,
    ) -> DispatchReport {
        let event = payload.event;
        let mut states = vec![DispatchState::Idle];

        transition(&mut states, event, DispatchState::CollectingMatches);
        let table = self.table();
        let subject = payload.subject.as_deref();
        let commands = table.matching_commands(event, subject);
        let callbacks: Vec<CallbackHook> = self
            .callbacks
            .read()
            .iter()
            .filter(|(kind, hook)| *kind == event && hook.matches(subject))
            .map(|(_, hook)| hook.clone())
            .collect();

        transition(&mut states, event, DispatchState::Executing);
        if commands.is_empty() && callbacks.is_empty() {
            debug!("No hooks matched {} (subject: {:?})", event, subject);
            transition(&mut states, event, DispatchState::Done);
            let decision = Decision::pass();
            self.stats.record_dispatch(&decision);
            return DispatchReport {
                event,
                decision,
                runs: Vec::new(),
                states,
                cancelled: false,
            };
        }

        info!(
            "Running {} hook(s) for {} (subject: {:?})",
            commands.len() + callbacks.len(),
            event.description(),
            subject
        );

        let semaphore = self.max_concurrency.map(|limit| Semaphore::new(limit.max(1)));
        let semaphore = semaphore.as_ref();
        let (command_outcomes, callback_outcomes) = tokio::join!(
            self.run_commands(&commands, payload, cancel, semaphore),
            self.run_callbacks(&callbacks, payload, cancel, semaphore),
        );

        // Only a hook that was actually interrupted makes the dispatch cancelled.
        let cancelled = command_outcomes
            .iter()
            .any(|(outcome, _)| matches!(outcome, Err(HookExecutionError::Cancelled { .. })))
            || callback_outcomes
                .iter()
                .any(|(outcome, _)| matches!(outcome, CallbackOutcome::Cancelled));

        let mut runs: Vec<HookRun> = commands
            .iter()
            .zip(command_outcomes)
            .map(|(command, (outcome, elapsed))| self.record_command(event, command, outcome, elapsed))
            .collect();
        runs.extend(
            callbacks
                .iter()
                .zip(callback_outcomes)
                .map(|(hook, (outcome, elapsed))| self.record_callback(event, hook, outcome, elapsed)),
        );
        self.stats.record_runs(commands.len(), callbacks.len());

        if cancelled {
            transition(&mut states, event, DispatchState::Done);
            self.stats.record_cancellation();
            return DispatchReport {
                event,
                decision: Decision::pass().stop_session(CANCELLED_REASON),
                runs,
                states,
                cancelled: true,
            };
        }

        transition(&mut states, event, DispatchState::Aggregating);
        let decisions: Vec<Decision> = runs.iter().map(|run| run.decision.clone()).collect();
        let decision = aggregate(event, &decisions);
        transition(&mut states, event, DispatchState::Done);

        self.stats.record_dispatch(&decision);
        info!("Hooks for {} resolved: {}", event, decision);

        DispatchReport {
            event,
            decision,
            runs,
            states,
            cancelled: false,
        }
    }

    /// Run commands concurrently; results come back in input order
    async fn run_commands(
        &self,
        commands: &[&HookCommand],
        payload: &EventPayload,
        cancel: &CancellationToken,
        semaphore: Option<&Semaphore>,
    ) -> Vec<(Result<HookExecutionResult, HookExecutionError>, Duration)> {
        join_all(commands.iter().map(|command| async move {
            let start = Instant::now();
            let _permit = match semaphore {
                Some(semaphore) => semaphore.acquire().await.ok(),
                None => None,
            };
            let outcome = if cancel.is_cancelled() {
                Err(HookExecutionError::Cancelled {
                    command: command.command.clone(),
                })
            } else {
                self.process.execute_with_cancel(command, payload, cancel).await
            };
            (outcome, start.elapsed())
        }))
        .await
    }

    /// Run callbacks concurrently on the blocking pool; results come back in input order
    async fn run_callbacks(
        &self,
        callbacks: &[CallbackHook],
        payload: &EventPayload,
        cancel: &CancellationToken,
        semaphore: Option<&Semaphore>,
    ) -> Vec<(CallbackOutcome, Duration)> {
        join_all(callbacks.iter().map(|hook| async move {
            let start = Instant::now();
            let _permit = match semaphore {
                Some(semaphore) => semaphore.acquire().await.ok(),
                None => None,
            };
            let outcome = if cancel.is_cancelled() {
                CallbackOutcome::Cancelled
            } else {
                run_callback(hook.clone(), payload.clone(), cancel).await
            };
            (outcome, start.elapsed())
        }))
        .await
    }

    /// Interpret one command outcome, reporting anything the user should see
    fn record_command(
        &self,
        event: EventKind,
        command: &HookCommand,
        outcome: Result<HookExecutionResult, HookExecutionError>,
        elapsed: Duration,
    ) -> HookRun {
        match outcome {
            Ok(result) => {
                let decision = interpret(event, &result);
                let failure = result.failure(command);
                match &failure {
                    Some(err) => self.warn(HookWarning::from_execution_error(
                        event,
                        command.command.clone(),
                        err,
                    )),
                    None if result.success() && decision.verdict == Verdict::Pass => {
                        if let Some(text) = decision.reason.as_deref() {
                            self.reporter.message(event, &command.command, text);
                        }
                    }
                    None => {}
                }
                debug!(
                    "Hook '{}' finished in {}ms (exit {}): {}",
                    command,
                    result.duration_ms(),
                    result.exit_code,
                    decision
                );
                HookRun {
                    source: command.command.clone(),
                    decision,
                    exit_code: Some(result.exit_code),
                    duration_ms: result.duration_ms(),
                    timed_out: result.timed_out,
                    error: failure.map(|err| err.to_string()),
                }
            }
            Err(err) => {
                if let HookExecutionError::SpawnFailed { .. } = err {
                    error!("{}", err);
                }
                if !matches!(err, HookExecutionError::Cancelled { .. }) {
                    self.warn(HookWarning::from_execution_error(
                        event,
                        command.command.clone(),
                        &err,
                    ));
                }
                HookRun {
                    source: command.command.clone(),
                    decision: Decision::pass_with_reason(err.to_string()),
                    exit_code: None,
                    duration_ms: elapsed.as_millis() as u64,
                    timed_out: false,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    fn record_callback(
        &self,
        event: EventKind,
        hook: &CallbackHook,
        outcome: CallbackOutcome,
        elapsed: Duration,
    ) -> HookRun {
        let (decision, timed_out, error) = match outcome {
            CallbackOutcome::Finished(decision) => {
                debug!("Callback hook '{}' returned {}", hook.name, decision);
                (decision, false, None)
            }
            CallbackOutcome::Panicked(message) => {
                self.warn(HookWarning::new(
                    event,
                    hook.name.clone(),
                    WarningKind::Panicked,
                    message.clone(),
                ));
                (Decision::pass_with_reason(message.clone()), false, Some(message))
            }
            CallbackOutcome::TimedOut => {
                let err = HookExecutionError::Timeout {
                    command: hook.name.clone(),
                    timeout_secs: hook.timeout_secs,
                };
                self.warn(HookWarning::from_execution_error(event, hook.name.clone(), &err));
                (Decision::pass_with_reason(TIMED_OUT_REASON), true, Some(err.to_string()))
            }
            CallbackOutcome::Cancelled => {
                let err = HookExecutionError::Cancelled {
                    command: hook.name.clone(),
                };
                (Decision::pass_with_reason(err.to_string()), false, Some(err.to_string()))
            }
        };
        HookRun {
            source: hook.name.clone(),
            decision,
            exit_code: None,
            duration_ms: elapsed.as_millis() as u64,
            timed_out,
            error,
        }
    }

    fn warn(&self, warning: HookWarning) {
        self.stats.record_warning(&warning);
        self.reporter.warning(&warning);
    }
}

/// How an in-process callback ended
enum CallbackOutcome {
    Finished(Decision),
    Panicked(String),
    TimedOut,
    Cancelled,
}

async fn run_callback(
    hook: CallbackHook,
    payload: EventPayload,
    cancel: &CancellationToken,
) -> CallbackOutcome {
    let deadline = hook.timeout();
    let name = hook.name.clone();
    let task = tokio::task::spawn_blocking(move || hook.try_call(&payload));

    tokio::select! {
        biased;
        joined = timeout(deadline, task) => match joined {
            Ok(Ok(Ok(decision))) => CallbackOutcome::Finished(decision),
            Ok(Ok(Err(panic))) => CallbackOutcome::Panicked(panic),
            Ok(Err(e)) => CallbackOutcome::Panicked(format!("callback hook '{}' failed: {}", name, e)),
            Err(_) => {
                warn!("Callback hook '{}' timed out after {:?}", name, deadline);
                CallbackOutcome::TimedOut
            }
        },
        _ = cancel.cancelled() => {
            debug!("Callback hook '{}' cancelled", name);
            CallbackOutcome::Cancelled
        }
    }
}

fn transition(states: &mut Vec<DispatchState>, event: EventKind, next: DispatchState) {
    debug!("Dispatch {}: {:?} -> {:?}", event, states.last(), next);
    states.push(next);
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("commands", &self.table.read().command_count())
            .field("callbacks", &self.callbacks.read().len())
            .field("max_concurrency", &self.max_concurrency)
            .finish()
    }
}
