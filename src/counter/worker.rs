//! Count-up and count-down worker routines
//!
//! Each routine runs on its own thread and returns a `WorkerOutcome`; errors
//! are logged and folded into the outcome instead of escaping the thread.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, error, info};

use crate::coordination::{CancellationToken, CompletionGate};
use crate::domain::{WorkerOutcome, WorkerRole};
use crate::error::{GateError, Result};
use crate::output::{OutputSink, StepLine};

/// Knobs for one counting run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSettings {
    /// Inclusive upper bound of both ranges
    pub max_count: u32,
    /// Sleep after each emitted step
    pub pacing: Duration,
    /// Bound on the count-down wait; `None` waits forever
    pub wait_timeout: Option<Duration>,
    /// Abandon the gate when count-up fails, releasing the waiter
    pub release_on_failure: bool,
}

impl Default for CounterSettings {
    fn default() -> Self {
        Self {
            max_count: 20,
            pacing: Duration::from_millis(5),
            wait_timeout: None,
            release_on_failure: true,
        }
    }
}

impl CounterSettings {
    pub fn with_max_count(mut self, max_count: u32) -> Self {
        self.max_count = max_count;
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn with_release_on_failure(mut self, release: bool) -> Self {
        self.release_on_failure = release;
        self
    }
}

/// Everything a worker shares with its peer
#[derive(Clone)]
pub struct WorkerContext {
    pub gate: Arc<CompletionGate>,
    pub sink: Arc<dyn OutputSink>,
    pub token: CancellationToken,
    pub settings: CounterSettings,
}

/// Abandons the gate when count-up leaves without opening it, panics included.
struct AbandonOnDrop<'a> {
    gate: &'a CompletionGate,
    armed: bool,
    reason: Option<String>,
}

impl<'a> AbandonOnDrop<'a> {
    fn new(gate: &'a CompletionGate, armed: bool) -> Self {
        Self {
            gate,
            armed,
            reason: None,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    fn fail(&mut self, reason: String) {
        self.reason = Some(reason);
    }
}

impl Drop for AbandonOnDrop<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let reason = match self.reason.take() {
            Some(reason) => format!("count-up failed: {}", reason),
            None if thread::panicking() => "count-up worker panicked".to_string(),
            None => "count-up worker exited before opening the gate".to_string(),
        };
        if let Err(e) = self.gate.abandon(reason) {
            error!("Failed to abandon gate: {}", e);
        }
    }
}

fn pace(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

/// Emit `0..=max_count`, then open the gate
pub fn count_up(ctx: &WorkerContext) -> WorkerOutcome {
    let mut guard = AbandonOnDrop::new(&ctx.gate, ctx.settings.release_on_failure);
    let mut steps = 0;

    match run_up(ctx, &mut steps) {
        Ok(()) => {
            guard.disarm();
            info!("count-up completed {} steps, gate open", steps);
            WorkerOutcome::Completed { steps }
        }
        Err(GateError::Cancelled) => {
            guard.disarm();
            info!("count-up cancelled after {} steps", steps);
            WorkerOutcome::Cancelled { steps }
        }
        Err(e) => {
            error!("count-up failed after {} steps: {}", steps, e);
            let reason = e.to_string();
            guard.fail(reason.clone());
            WorkerOutcome::Failed { steps, reason }
        }
    }
}

fn run_up(ctx: &WorkerContext, steps: &mut u32) -> Result<()> {
    ctx.gate.begin_up()?;
    for value in 0..=ctx.settings.max_count {
        if ctx.token.is_cancelled() {
            return Err(GateError::Cancelled);
        }
        ctx.sink.emit(&StepLine::new(WorkerRole::Up, value))?;
        *steps += 1;
        pace(ctx.settings.pacing);
    }
    ctx.gate.open()
}

/// Wait for the gate, then emit `max_count..=0`
pub fn count_down(ctx: &WorkerContext) -> WorkerOutcome {
    let mut steps = 0;

    match run_down(ctx, &mut steps) {
        Ok(()) => {
            info!("count-down completed {} steps", steps);
            WorkerOutcome::Completed { steps }
        }
        Err(GateError::Cancelled) => {
            info!("count-down cancelled after {} steps", steps);
            WorkerOutcome::Cancelled { steps }
        }
        Err(e) => {
            error!("count-down failed after {} steps: {}", steps, e);
            WorkerOutcome::Failed {
                steps,
                reason: e.to_string(),
            }
        }
    }
}

fn run_down(ctx: &WorkerContext, steps: &mut u32) -> Result<()> {
    debug!("count-down waiting on gate (timeout: {:?})", ctx.settings.wait_timeout);
    ctx.gate.wait(&ctx.token, ctx.settings.wait_timeout)?;
    ctx.gate.begin_down()?;

    for value in (0..=ctx.settings.max_count).rev() {
        if ctx.token.is_cancelled() {
            return Err(GateError::Cancelled);
        }
        ctx.sink.emit(&StepLine::new(WorkerRole::Down, value))?;
        *steps += 1;
        pace(ctx.settings.pacing);
    }
    Ok(())
}
