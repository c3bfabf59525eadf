//! Error types for gatecount
//!
//! Centralized error handling using thiserror.

use std::time::Duration;

use thiserror::Error;

/// All error types that can occur while coordinating a counting run
#[derive(Debug, Error)]
pub enum GateError {
    /// Invalid state transition or operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The count-up side gave up before opening the gate
    #[error("Gate abandoned: {0}")]
    Abandoned(String),

    /// Bounded wait on the gate elapsed
    #[error("Timed out after {0:?} waiting for gate")]
    TimedOut(Duration),

    /// Cooperative cancellation was requested
    #[error("Cancelled")]
    Cancelled,

    /// A lock was poisoned by a panicking holder
    #[error("Lock poisoned: {0}")]
    Poisoned(String),

    /// Output sink rejected a line
    #[error("Output error: {0}")]
    Output(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for gatecount operations
pub type Result<T> = std::result::Result<T, GateError>;
