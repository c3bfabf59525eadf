//! Run phase state machine
//!
//! A run moves strictly forward through
//! `NotStarted -> UpRunning -> UpComplete -> DownRunning -> Done`.
//! `Aborted` is reachable from any non-terminal phase.

use serde::{Deserialize, Serialize};

/// Phase of a single counting run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Gate created, no worker has started counting
    NotStarted,
    /// Count-up worker is emitting values
    UpRunning,
    /// Count-up finished and the gate is open
    UpComplete,
    /// Count-down worker passed the gate and is emitting values
    DownRunning,
    /// Both workers returned after completing their phase
    Done,
    /// Run ended without reaching Done (failure, panic, timeout or cancellation)
    Aborted,
}

impl RunPhase {
    /// Returns true if the run is in a terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Aborted)
    }

    /// Check whether moving from `self` to `next` is a legal edge
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        use RunPhase::*;
        match (self, next) {
            (NotStarted, UpRunning) => true,
            (UpRunning, UpComplete) => true,
            (UpComplete, DownRunning) => true,
            (DownRunning, Done) => true,
            (from, Aborted) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunPhase::NotStarted => "not-started",
            RunPhase::UpRunning => "up-running",
            RunPhase::UpComplete => "up-complete",
            RunPhase::DownRunning => "down-running",
            RunPhase::Done => "done",
            RunPhase::Aborted => "aborted",
        };
        write!(f, "{}", name)
    }
}
