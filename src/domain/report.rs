//! Summary of a finished counting run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::outcome::WorkerOutcome;
use super::phase::RunPhase;

/// Result of one `GatedCounter::run`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Inclusive upper bound both workers counted against
    pub max_count: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Count-up worker outcome
    pub up: WorkerOutcome,
    /// Count-down worker outcome
    pub down: WorkerOutcome,
    /// Phase the gate ended in
    pub phase: RunPhase,
    /// Wakeups the count-down worker saw while the gate was still closed
    pub spurious_wakeups: u64,
}

impl RunReport {
    /// A run succeeds only when both workers completed and the run reached Done
    pub fn is_success(&self) -> bool {
        self.up.is_completed() && self.down.is_completed() && self.phase == RunPhase::Done
    }

    /// Wall-clock duration of the run in milliseconds
    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
