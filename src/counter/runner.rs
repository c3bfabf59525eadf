//! Run orchestrator
//!
//! Spawns the two workers on named OS threads, joins them, and turns the
//! result into a `RunReport`. A panicking worker is reported, not re-raised.

use std::any::Any;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::Utc;
use log::{error, info};

use crate::coordination::{CancellationToken, CompletionGate};
use crate::counter::worker::{CounterSettings, WorkerContext, count_down, count_up};
use crate::domain::{RunReport, WorkerOutcome, WorkerRole};
use crate::error::Result;
use crate::output::OutputSink;

/// Two workers, one gate, one sink
pub struct GatedCounter {
    settings: CounterSettings,
    sink: Arc<dyn OutputSink>,
    token: CancellationToken,
}

impl GatedCounter {
    pub fn new(settings: CounterSettings, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            settings,
            sink,
            token: CancellationToken::new(),
        }
    }

    pub fn settings(&self) -> &CounterSettings {
        &self.settings
    }

    /// Handle for cancelling runs of this counter from another thread
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Run both workers to completion.
    ///
    /// Only thread spawn failures and a poisoned gate surface as `Err`;
    /// everything a worker hits is reported in its outcome.
    pub fn run(&self) -> Result<RunReport> {
        let started_at = Utc::now();
        let gate = Arc::new(CompletionGate::new());
        let _registration = {
            let gate = Arc::downgrade(&gate);
            self.token.on_cancel(move || {
                if let Some(gate) = gate.upgrade() {
                    gate.notify_waiters();
                }
            })
        };

        info!(
            "Starting run: max_count={} pacing={:?} wait_timeout={:?} release_on_failure={}",
            self.settings.max_count,
            self.settings.pacing,
            self.settings.wait_timeout,
            self.settings.release_on_failure
        );

        let ctx = WorkerContext {
            gate: gate.clone(),
            sink: self.sink.clone(),
            token: self.token.clone(),
            settings: self.settings.clone(),
        };

        let up = spawn_worker(WorkerRole::Up, ctx.clone(), count_up)?;
        let down = match spawn_worker(WorkerRole::Down, ctx, count_down) {
            Ok(handle) => handle,
            Err(e) => {
                // Up is already running; let it finish before reporting
                join_worker(WorkerRole::Up, up);
                return Err(e);
            }
        };

        let up = join_worker(WorkerRole::Up, up);
        let down = join_worker(WorkerRole::Down, down);

        let phase = gate.conclude(up.is_completed() && down.is_completed())?;
        let snapshot = gate.snapshot()?;

        let report = RunReport {
            max_count: self.settings.max_count,
            started_at,
            finished_at: Utc::now(),
            up,
            down,
            phase,
            spurious_wakeups: snapshot.spurious_wakeups,
        };
        info!("Run finished in phase {} after {}ms", report.phase, report.elapsed_ms());
        Ok(report)
    }
}

fn spawn_worker(
    role: WorkerRole,
    ctx: WorkerContext,
    body: fn(&WorkerContext) -> WorkerOutcome,
) -> Result<JoinHandle<WorkerOutcome>> {
    let handle = thread::Builder::new()
        .name(role.thread_name().to_string())
        .spawn(move || body(&ctx))?;
    Ok(handle)
}

fn join_worker(role: WorkerRole, handle: JoinHandle<WorkerOutcome>) -> WorkerOutcome {
    handle.join().unwrap_or_else(|payload| {
        let reason = panic_message(payload.as_ref());
        error!("{} worker panicked: {}", role, reason);
        WorkerOutcome::Panicked { reason }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
