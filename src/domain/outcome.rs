//! Worker identity and execution outcome types.

use serde::{Deserialize, Serialize};

/// Which side of the gate a worker runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerRole {
    /// Counts 0..=N, then opens the gate
    Up,
    /// Waits on the gate, then counts N..=0
    Down,
}

impl WorkerRole {
    /// Tag printed in front of every emitted value
    pub fn tag(&self) -> &'static str {
        match self {
            WorkerRole::Up => "up",
            WorkerRole::Down => "down",
        }
    }

    /// OS thread name used for the worker
    pub fn thread_name(&self) -> &'static str {
        match self {
            WorkerRole::Up => "count-up",
            WorkerRole::Down => "count-down",
        }
    }
}

impl std::fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Outcome of one worker's execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WorkerOutcome {
    /// Every step of the worker's range was emitted
    Completed { steps: u32 },
    /// Worker stopped on an error after emitting `steps` values
    Failed { steps: u32, reason: String },
    /// Worker observed cancellation after emitting `steps` values
    Cancelled { steps: u32 },
    /// Worker thread panicked; caught at join
    Panicked { reason: String },
}

impl WorkerOutcome {
    /// Returns true if the worker finished its whole range
    pub fn is_completed(&self) -> bool {
        matches!(self, WorkerOutcome::Completed { .. })
    }

    /// Number of values emitted before the worker returned
    pub fn steps(&self) -> u32 {
        match self {
            WorkerOutcome::Completed { steps }
            | WorkerOutcome::Failed { steps, .. }
            | WorkerOutcome::Cancelled { steps } => *steps,
            WorkerOutcome::Panicked { .. } => 0,
        }
    }

    /// Failure reason, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            WorkerOutcome::Failed { reason, .. } | WorkerOutcome::Panicked { reason } => Some(reason),
            _ => None,
        }
    }
}
