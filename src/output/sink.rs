//! Output sinks
//!
//! Every sink owns its own lock, independent of the gate lock, so two
//! workers emitting at the same time never interleave inside a line.

use std::io::Write;
use std::sync::Mutex;

use colored::*;

use crate::domain::WorkerRole;
use crate::error::{GateError, Result};

/// One counting step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepLine {
    pub role: WorkerRole,
    pub value: u32,
}

impl StepLine {
    pub fn new(role: WorkerRole, value: u32) -> Self {
        Self { role, value }
    }

    /// Bracketed tag padded so values line up across roles
    pub fn padded_tag(&self) -> String {
        format!("{:<7}", format!("[{}]", self.role.tag()))
    }
}

impl std::fmt::Display for StepLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.padded_tag(), self.value)
    }
}

/// Destination for counting steps
pub trait OutputSink: Send + Sync {
    /// Write one step. Must be safe to call from both workers at once.
    fn emit(&self, line: &StepLine) -> Result<()>;
}

/// Writes `[tag] value` lines to stdout
pub struct StdoutSink {
    lock: Mutex<()>,
    color: bool,
}

impl StdoutSink {
    pub fn new(color: bool) -> Self {
        Self {
            lock: Mutex::new(()),
            color,
        }
    }

    fn render(&self, line: &StepLine) -> String {
        if !self.color {
            return line.to_string();
        }
        let tag = match line.role {
            WorkerRole::Up => line.padded_tag().as_str().green(),
            WorkerRole::Down => line.padded_tag().as_str().cyan(),
        };
        format!("{}{}", tag, line.value)
    }
}

impl OutputSink for StdoutSink {
    fn emit(&self, line: &StepLine) -> Result<()> {
        let rendered = self.render(line);
        let _guard = self
            .lock
            .lock()
            .map_err(|_| GateError::Poisoned("stdout sink".to_string()))?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", rendered)?;
        stdout.flush()?;
        Ok(())
    }
}

/// Records steps in emission order
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<StepLine>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every step recorded so far
    pub fn lines(&self) -> Vec<StepLine> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_else(|e| e.into_inner().clone())
    }

    /// Recorded values for one role, in emission order
    pub fn values(&self, role: WorkerRole) -> Vec<u32> {
        self.lines()
            .into_iter()
            .filter(|l| l.role == role)
            .map(|l| l.value)
            .collect()
    }

    /// Transcript as it would appear on stdout without color
    pub fn transcript(&self) -> String {
        self.lines()
            .iter()
            .map(|l| format!("{}\n", l))
            .collect()
    }
}

impl OutputSink for MemorySink {
    fn emit(&self, line: &StepLine) -> Result<()> {
        self.lines
            .lock()
            .map_err(|_| GateError::Poisoned("memory sink".to_string()))?
            .push(*line);
        Ok(())
    }
}
