//! Hook dispatch engine
//!
//! Hooks are external commands (or in-process callbacks) run at agent lifecycle
//! events. Each hook receives the event as JSON on stdin and answers with an exit
//! code and optional JSON on stdout; the engine turns all answers for one event
//! into a single [`Decision`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use hookgate_core::hooks::{
//!     EventDispatcher, EventKind, EventPayload, HookCommand, HookConfigTable, HookEntry, Verdict,
//! };
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let guard = HookCommand::new("/usr/local/bin/guard-writes").with_timeout(10);
//! let table = HookConfigTable::try_from_events(vec![(
//!     EventKind::PreAction,
//!     vec![HookEntry::with_pattern("Write|Edit", vec![guard])],
//! )])?;
//!
//! let dispatcher = EventDispatcher::new(table);
//! let payload = EventPayload::pre_action("session-123", "Write", json!({"path": "/etc/hosts"}));
//!
//! let decision = dispatcher.dispatch(&payload).await;
//! if decision.verdict == Verdict::Deny {
//!     println!("write refused: {}", decision.reason.unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod callback_hook;
pub mod command_hook;
pub mod dispatcher;
pub mod events;
pub mod hook_config;
pub mod hook_input;
pub mod hook_output;
pub mod interpreter;
pub mod matcher;
pub mod process;
pub mod report;
pub mod stats;

// Re-export main types
pub use aggregator::aggregate;
pub use callback_hook::CallbackHook;
pub use command_hook::{HookCommand, DEFAULT_TIMEOUT_SECS};
pub use dispatcher::{
    DispatchOptions, DispatchReport, DispatchState, EventDispatcher, HookRun, CANCELLED_REASON,
};
pub use events::EventKind;
pub use hook_config::{HookConfigTable, HookConfigTableBuilder, HookEntry};
pub use hook_input::EventPayload;
pub use hook_output::{Decision, Verdict};
pub use interpreter::{interpret, HookResponse, BLOCKING_EXIT_CODE};
pub use matcher::{matches, PatternMatcher};
pub use process::{
    HookExecutionResult, HookProcess, ProcessOptions, DEFAULT_KILL_GRACE,
    DEFAULT_MAX_OUTPUT_BYTES, TIMED_OUT_EXIT_CODE,
};
pub use report::{HookReporter, HookWarning, TracingReporter, WarningKind};
pub use stats::HookStatistics;
