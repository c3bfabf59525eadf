//! gatecount - two counter threads coordinated by a condition-variable gate
//!
//! The count-up worker emits `0..=N` and then opens a completion gate. The
//! count-down worker parks on that gate and only emits `N..=0` once it is
//! open, so the whole ascending sequence always precedes the descending one.

pub mod coordination;
pub mod counter;
pub mod domain;
pub mod error;
pub mod output;

pub use coordination::{CancellationToken, CompletionGate};
pub use counter::{CounterSettings, GatedCounter};
pub use domain::{RunPhase, RunReport, WorkerOutcome, WorkerRole};
pub use error::{GateError, Result};
pub use output::{MemorySink, OutputSink, StdoutSink, StepLine};
