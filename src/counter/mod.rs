//! Gate-synchronized counter
//!
//! `count_up` emits the ascending range and opens the gate; `count_down`
//! waits on the gate and emits the descending range. `GatedCounter` runs
//! both on their own threads.

pub mod runner;
pub mod worker;

pub use runner::GatedCounter;
pub use worker::{CounterSettings, WorkerContext, count_down, count_up};
