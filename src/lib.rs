//! Hookgate
//!
//! Intercepts agent lifecycle events, runs the command hooks configured for them
//! and resolves their outputs into one decision the agent runtime must honour.
//!
//! This crate re-exports [`hookgate_core`]; the `hookgate` binary lives in
//! `crates/hookgate-cli`.
//!
//! ```rust,no_run
//! use hookgate::{EventPayload, Verdict};
//! use hookgate::settings::ConfigStore;
//!
//! # async fn example() {
//! let dispatcher = ConfigStore::discover().load().into_dispatcher();
//! let payload = EventPayload::pre_action("session-1", "Write", serde_json::json!({"path": "a.txt"}));
//! let decision = dispatcher.dispatch(&payload).await;
//! if decision.verdict == Verdict::Deny {
//!     eprintln!("denied: {}", decision.reason.unwrap_or_default());
//! }
//! # }
//! ```

pub use hookgate_core::*;
