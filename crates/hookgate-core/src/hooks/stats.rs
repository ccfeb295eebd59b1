//! Hook error statistics

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::hook_output::Decision;
use super::report::{HookWarning, WarningKind};

/// Most recent warnings kept in a snapshot
pub const MAX_RECENT_WARNINGS: usize = 50;

/// Counters collected by the dispatcher since creation or the last reset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookStatistics {
    pub dispatches: u64,
    pub commands_run: u64,
    pub callbacks_run: u64,
    pub spawn_failures: u64,
    pub timeouts: u64,
    pub non_blocking_failures: u64,
    pub cancellations: u64,
    pub blocking_decisions: u64,
    pub invalid_patterns: u64,
    /// Oldest first, at most [`MAX_RECENT_WARNINGS`]
    pub recent_warnings: VecDeque<HookWarning>,
}

impl HookStatistics {
    /// Total number of hook failures of any kind
    pub fn failures(&self) -> u64 {
        self.spawn_failures + self.timeouts + self.non_blocking_failures
    }
}

/// Thread-safe accumulator behind [`HookStatistics`]
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    inner: Mutex<HookStatistics>,
}

impl StatsRecorder {
    pub fn record_dispatch(&self, decision: &Decision) {
        let mut stats = self.inner.lock();
        stats.dispatches += 1;
        if decision.is_blocking() {
            stats.blocking_decisions += 1;
        }
    }

    pub fn record_runs(&self, commands: usize, callbacks: usize) {
        let mut stats = self.inner.lock();
        stats.commands_run += commands as u64;
        stats.callbacks_run += callbacks as u64;
    }

    pub fn record_cancellation(&self) {
        self.inner.lock().cancellations += 1;
    }

    pub fn record_warning(&self, warning: &HookWarning) {
        let mut stats = self.inner.lock();
        match warning.kind {
            WarningKind::SpawnFailed => stats.spawn_failures += 1,
            WarningKind::Timeout => stats.timeouts += 1,
            WarningKind::InvalidPattern => stats.invalid_patterns += 1,
            WarningKind::Cancelled => {}
            WarningKind::NonZeroExit | WarningKind::Io | WarningKind::Panicked => {
                stats.non_blocking_failures += 1
            }
        }
        if stats.recent_warnings.len() == MAX_RECENT_WARNINGS {
            stats.recent_warnings.pop_front();
        }
        stats.recent_warnings.push_back(warning.clone());
    }

    pub fn snapshot(&self) -> HookStatistics {
        self.inner.lock().clone()
    }

    pub fn reset(&self) {
        *self.inner.lock() = HookStatistics::default();
    }
}
