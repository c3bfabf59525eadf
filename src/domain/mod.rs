//! Domain types for gatecount
//!
//! This module contains the core domain types:
//! - RunPhase: per-run state machine guarded by the completion gate
//! - WorkerRole / WorkerOutcome: identity and result of each worker
//! - RunReport: summary handed back by the orchestrator

pub mod outcome;
pub mod phase;
pub mod report;

pub use outcome::{WorkerOutcome, WorkerRole};
pub use phase::RunPhase;
pub use report::RunReport;
