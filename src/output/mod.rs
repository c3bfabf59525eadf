//! Output module
//!
//! Where counting steps go: stdout for the CLI, memory for tests and
//! library callers that want the transcript.

pub mod sink;

pub use sink::{MemorySink, OutputSink, StdoutSink, StepLine};
