//! Completion gate shared by the count-up and count-down workers
//!
//! One `Mutex` guards the completion flag together with the run phase; one
//! `Condvar` is paired with that mutex. The flag goes false -> true at most
//! once, and only through `open`. Waiters re-check the flag every time they
//! wake, so a notify without a state change just puts them back to sleep.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::coordination::cancel::CancellationToken;
use crate::domain::RunPhase;
use crate::error::{GateError, Result};

#[derive(Debug)]
struct GateInner {
    up_complete: bool,
    phase: RunPhase,
    abandoned: Option<String>,
    waiting: usize,
    spurious_wakeups: u64,
}

/// Point-in-time copy of the gate state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSnapshot {
    pub up_complete: bool,
    pub phase: RunPhase,
    pub abandoned: Option<String>,
    /// Threads currently parked in `wait`
    pub waiting: usize,
    pub spurious_wakeups: u64,
}

/// Single-use gate: closed until the count-up side opens it
#[derive(Debug)]
pub struct CompletionGate {
    state: Mutex<GateInner>,
    cond: Condvar,
}

impl Default for CompletionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionGate {
    /// Create a closed gate in `NotStarted`
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateInner {
                up_complete: false,
                phase: RunPhase::NotStarted,
                abandoned: None,
                waiting: 0,
                spurious_wakeups: 0,
            }),
            cond: Condvar::new(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, GateInner>> {
        self.state
            .lock()
            .map_err(|_| GateError::Poisoned("completion gate".to_string()))
    }

    fn transition(inner: &mut GateInner, next: RunPhase) -> Result<()> {
        if !inner.phase.can_transition_to(next) {
            return Err(GateError::InvalidState(format!(
                "cannot move from {} to {}",
                inner.phase, next
            )));
        }
        debug!("Gate phase {} -> {}", inner.phase, next);
        inner.phase = next;
        Ok(())
    }

    /// Record that the count-up worker started emitting
    pub fn begin_up(&self) -> Result<()> {
        let mut inner = self.lock()?;
        Self::transition(&mut inner, RunPhase::UpRunning)
    }

    /// Set the completion flag and wake every waiter.
    ///
    /// Fails if the gate is already open or was abandoned; the flag never
    /// goes back to false.
    pub fn open(&self) -> Result<()> {
        {
            let mut inner = self.lock()?;
            if inner.up_complete {
                return Err(GateError::InvalidState("gate already open".to_string()));
            }
            if let Some(reason) = &inner.abandoned {
                return Err(GateError::InvalidState(format!("gate was abandoned: {}", reason)));
            }
            Self::transition(&mut inner, RunPhase::UpComplete)?;
            inner.up_complete = true;
        }
        self.cond.notify_all();
        Ok(())
    }

    /// Give up on opening the gate and release every waiter with an error.
    ///
    /// Returns false (and changes nothing) if the gate is already open or
    /// already abandoned.
    pub fn abandon(&self, reason: impl Into<String>) -> Result<bool> {
        {
            let mut inner = self.lock()?;
            if inner.up_complete || inner.abandoned.is_some() {
                return Ok(false);
            }
            let reason = reason.into();
            warn!("Abandoning gate: {}", reason);
            inner.abandoned = Some(reason);
            if !inner.phase.is_terminal() {
                Self::transition(&mut inner, RunPhase::Aborted)?;
            }
        }
        self.cond.notify_all();
        Ok(true)
    }

    /// Block until the gate opens.
    ///
    /// Returns `Abandoned`, `Cancelled` or `TimedOut` instead when one of
    /// those happens first. A `None` timeout waits without bound.
    pub fn wait(&self, token: &CancellationToken, timeout: Option<Duration>) -> Result<()> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut inner = self.lock()?;
        inner.waiting += 1;

        let result = loop {
            if inner.up_complete {
                break Ok(());
            }
            if let Some(reason) = &inner.abandoned {
                break Err(GateError::Abandoned(reason.clone()));
            }
            if token.is_cancelled() {
                break Err(GateError::Cancelled);
            }

            let timed_out = match deadline {
                None => {
                    inner = self
                        .cond
                        .wait(inner)
                        .map_err(|_| GateError::Poisoned("completion gate".to_string()))?;
                    false
                }
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        break Err(GateError::TimedOut(timeout.unwrap_or_default()));
                    }
                    let (guard, res) = self
                        .cond
                        .wait_timeout(inner, remaining)
                        .map_err(|_| GateError::Poisoned("completion gate".to_string()))?;
                    inner = guard;
                    res.timed_out()
                }
            };

            if !timed_out && !inner.up_complete && inner.abandoned.is_none() && !token.is_cancelled() {
                inner.spurious_wakeups += 1;
                debug!("Spurious wakeup #{} on closed gate", inner.spurious_wakeups);
            }
        };

        inner.waiting -= 1;
        result
    }

    /// Record that the count-down worker passed the gate
    pub fn begin_down(&self) -> Result<()> {
        let mut inner = self.lock()?;
        Self::transition(&mut inner, RunPhase::DownRunning)
    }

    /// Settle the run after both workers have returned
    pub fn conclude(&self, success: bool) -> Result<RunPhase> {
        let mut inner = self.lock()?;
        if success {
            Self::transition(&mut inner, RunPhase::Done)?;
        } else if !inner.phase.is_terminal() {
            Self::transition(&mut inner, RunPhase::Aborted)?;
        }
        Ok(inner.phase)
    }

    /// Wake every waiter without changing state.
    pub fn notify_waiters(&self) {
        // Taking the lock orders this notify after any waiter's predicate check.
        drop(self.state.lock());
        self.cond.notify_all();
    }

    pub fn snapshot(&self) -> Result<GateSnapshot> {
        let inner = self.lock()?;
        Ok(GateSnapshot {
            up_complete: inner.up_complete,
            phase: inner.phase,
            abandoned: inner.abandoned.clone(),
            waiting: inner.waiting,
            spurious_wakeups: inner.spurious_wakeups,
        })
    }

    /// Check the completion flag
    pub fn is_open(&self) -> Result<bool> {
        Ok(self.lock()?.up_complete)
    }
}
