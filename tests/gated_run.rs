//! End-to-end runs of the gated counter
//!
//! Drives `GatedCounter` and the worker routines through the public API with
//! in-memory and deliberately broken sinks.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use gatecount::counter::{WorkerContext, count_down, count_up};
use gatecount::{
    CancellationToken, CompletionGate, CounterSettings, GateError, GatedCounter, MemorySink, OutputSink, Result,
    RunPhase, StepLine, WorkerOutcome, WorkerRole,
};

/// Records like `MemorySink` but rejects `role` lines after `after` of them
struct FailingSink {
    inner: MemorySink,
    role: WorkerRole,
    after: u32,
    seen: AtomicU32,
}

impl FailingSink {
    fn new(role: WorkerRole, after: u32) -> Self {
        Self {
            inner: MemorySink::new(),
            role,
            after,
            seen: AtomicU32::new(0),
        }
    }
}

impl OutputSink for FailingSink {
    fn emit(&self, line: &StepLine) -> Result<()> {
        if line.role == self.role && self.seen.fetch_add(1, Ordering::SeqCst) >= self.after {
            return Err(GateError::Output(format!("{} sink closed", self.role)));
        }
        self.inner.emit(line)
    }
}

/// Panics on the first up line
struct PanickingSink;

impl OutputSink for PanickingSink {
    fn emit(&self, line: &StepLine) -> Result<()> {
        if line.role == WorkerRole::Up {
            panic!("up sink exploded");
        }
        Ok(())
    }
}

fn settings(max_count: u32) -> CounterSettings {
    CounterSettings::default()
        .with_max_count(max_count)
        .with_pacing(Duration::ZERO)
}

fn assert_strict_ordering(sink: &MemorySink, max_count: u32) {
    let lines = sink.lines();
    let expected: Vec<StepLine> = (0..=max_count)
        .map(|v| StepLine::new(WorkerRole::Up, v))
        .chain((0..=max_count).rev().map(|v| StepLine::new(WorkerRole::Down, v)))
        .collect();
    assert_eq!(lines, expected);
}

/// Bound 20: ascending up values, then descending down values, never mixed
#[test]
fn test_bound_twenty_scenario() {
    let sink = Arc::new(MemorySink::new());
    let counter = GatedCounter::new(
        CounterSettings::default().with_pacing(Duration::from_millis(1)),
        sink.clone(),
    );

    let report = counter.run().unwrap();

    assert!(report.is_success());
    assert_eq!(report.max_count, 20);
    assert_eq!(report.phase, RunPhase::Done);
    assert_eq!(sink.values(WorkerRole::Up), (0..=20).collect::<Vec<_>>());
    assert_eq!(sink.values(WorkerRole::Down), (0..=20).rev().collect::<Vec<_>>());
    assert_strict_ordering(&sink, 20);
    assert!(sink.transcript().starts_with("[up]   0\n[up]   1\n"));
    assert!(sink.transcript().ends_with("[down] 1\n[down] 0\n"));
}

/// Repeated runs never deadlock and never reorder
#[test]
fn test_many_runs_always_reach_done() {
    for _ in 0..50 {
        let sink = Arc::new(MemorySink::new());
        let report = GatedCounter::new(settings(10), sink.clone()).run().unwrap();
        assert_eq!(report.phase, RunPhase::Done);
        assert_strict_ordering(&sink, 10);
    }
}

/// A notify before the real open must put the count-down worker back to sleep
#[test]
fn test_spurious_wakeup_before_open() {
    let sink = Arc::new(MemorySink::new());
    let ctx = WorkerContext {
        gate: Arc::new(CompletionGate::new()),
        sink: sink.clone(),
        token: CancellationToken::new(),
        settings: settings(5),
    };

    let down = {
        let ctx = ctx.clone();
        thread::spawn(move || count_down(&ctx))
    };

    let deadline = Instant::now() + Duration::from_secs(5);
    while ctx.gate.snapshot().unwrap().waiting == 0 {
        assert!(Instant::now() < deadline, "count-down never parked");
        thread::sleep(Duration::from_millis(1));
    }

    ctx.gate.notify_waiters();
    while ctx.gate.snapshot().unwrap().spurious_wakeups == 0 {
        assert!(Instant::now() < deadline, "spurious wakeup never observed");
        thread::sleep(Duration::from_millis(1));
    }
    assert!(!down.is_finished());
    assert!(sink.values(WorkerRole::Down).is_empty());

    assert_eq!(count_up(&ctx), WorkerOutcome::Completed { steps: 6 });
    assert_eq!(down.join().unwrap(), WorkerOutcome::Completed { steps: 6 });
    assert_strict_ordering(&sink, 5);
}

/// Count-up fails mid-loop: the gate is released and count-down fails fast
#[test]
fn test_up_failure_releases_down() {
    let sink = Arc::new(FailingSink::new(WorkerRole::Up, 7));
    let report = GatedCounter::new(settings(20), sink.clone()).run().unwrap();

    assert!(!report.is_success());
    assert_eq!(report.phase, RunPhase::Aborted);
    assert!(matches!(report.up, WorkerOutcome::Failed { steps: 7, .. }));
    match &report.down {
        WorkerOutcome::Failed { steps, reason } => {
            assert_eq!(*steps, 0);
            assert!(reason.contains("up sink closed"), "unexpected reason: {}", reason);
        }
        other => panic!("Expected down failure, got {:?}", other),
    }
    assert_eq!(sink.inner.values(WorkerRole::Up), (0..7).collect::<Vec<_>>());
    assert!(sink.inner.values(WorkerRole::Down).is_empty());
}

/// Hold semantics: the gate stays closed and only the wait timeout ends the run
#[test]
fn test_up_failure_with_hold_times_out() {
    let sink = Arc::new(FailingSink::new(WorkerRole::Up, 3));
    let counter = GatedCounter::new(
        settings(20)
            .with_release_on_failure(false)
            .with_wait_timeout(Some(Duration::from_millis(100))),
        sink.clone(),
    );

    let started = Instant::now();
    let report = counter.run().unwrap();

    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(report.phase, RunPhase::Aborted);
    assert!(matches!(report.up, WorkerOutcome::Failed { steps: 3, .. }));
    assert!(matches!(&report.down, WorkerOutcome::Failed { steps: 0, reason } if reason.contains("Timed out")));
    assert!(sink.inner.values(WorkerRole::Down).is_empty());
}

/// A panicking count-up worker is reported and still releases count-down
#[test]
fn test_up_panic_is_contained() {
    let report = GatedCounter::new(settings(5), Arc::new(PanickingSink)).run().unwrap();

    assert_eq!(
        report.up,
        WorkerOutcome::Panicked {
            reason: "up sink exploded".to_string()
        }
    );
    assert!(matches!(&report.down, WorkerOutcome::Failed { reason, .. } if reason.contains("panicked")));
    assert_eq!(report.phase, RunPhase::Aborted);
}

/// Count-down failing mid-loop leaves count-up's result intact
#[test]
fn test_down_failure_after_gate() {
    let sink = Arc::new(FailingSink::new(WorkerRole::Down, 4));
    let report = GatedCounter::new(settings(10), sink.clone()).run().unwrap();

    assert_eq!(report.up, WorkerOutcome::Completed { steps: 11 });
    assert!(matches!(report.down, WorkerOutcome::Failed { steps: 4, .. }));
    assert_eq!(report.phase, RunPhase::Aborted);
    assert_eq!(sink.inner.values(WorkerRole::Down), vec![10, 9, 8, 7]);
}

/// Cancelling mid-run stops both workers cooperatively with partial counts
#[test]
fn test_cancel_mid_run() {
    let sink = Arc::new(MemorySink::new());
    let counter = GatedCounter::new(
        CounterSettings::default()
            .with_max_count(10_000)
            .with_pacing(Duration::from_millis(1)),
        sink.clone(),
    );

    let token = counter.cancellation_token();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        token.cancel();
    });

    let report = counter.run().unwrap();
    canceller.join().unwrap();

    assert_eq!(report.phase, RunPhase::Aborted);
    match report.up {
        WorkerOutcome::Cancelled { steps } => assert!(steps < 10_001),
        other => panic!("Expected cancelled count-up, got {:?}", other),
    }
    assert_eq!(report.down, WorkerOutcome::Cancelled { steps: 0 });
    assert!(sink.values(WorkerRole::Down).is_empty());
}

/// The report serializes for `--json` output
#[test]
fn test_report_serializes() {
    let report = GatedCounter::new(settings(2), Arc::new(MemorySink::new())).run().unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["phase"], "done");
    assert_eq!(json["up"]["status"], "completed");
    assert_eq!(json["up"]["steps"], 3);
    assert_eq!(json["down"]["steps"], 3);
}
