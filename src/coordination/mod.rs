//! Worker coordination module
//!
//! Implements the completion gate the count-down worker waits on, and the
//! cancellation token both workers observe.

pub mod cancel;
pub mod gate;

pub use cancel::{CancelRegistration, CancellationToken};
pub use gate::{CompletionGate, GateSnapshot};
