//! Guarded lifecycle state machine.
//!
//! `StateMachine` holds the last settled phase plus the run currently in
//! flight, if any. Every transition goes through `admit` and `finish`, so at
//! most one run exists per controller and callers arriving mid-run are
//! either attached to it (same direction) or queued behind it (opposite
//! direction).

use chrono::{DateTime, Utc};
use startstop_types::{Direction, LifecycleError, LifecyclePhase};
use uuid::Uuid;

use super::completion::Reply;

/// The run currently in flight and everything waiting on it.
#[derive(Debug)]
pub(crate) struct ActiveRun {
    pub run_id: Uuid,
    pub direction: Direction,
    pub started_at: DateTime<Utc>,
    /// Completions resolved with this run's outcome.
    pub waiters: Vec<Reply>,
    /// Opposite-direction calls retried once this run completes, in arrival order.
    pub deferred: Vec<(Direction, Reply)>,
}

/// What a lifecycle call turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    /// A new run was armed; the caller must spawn it.
    Run { run_id: Uuid },
    /// Attached to the in-flight run of the same direction.
    Joined,
    /// Queued behind the in-flight run of the opposite direction.
    Deferred,
}

#[derive(Debug)]
pub(crate) struct StateMachine {
    settled: LifecyclePhase,
    active: Option<ActiveRun>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            settled: LifecyclePhase::Stopped,
            active: None,
        }
    }

    pub fn phase(&self) -> LifecyclePhase {
        match &self.active {
            Some(run) => LifecyclePhase::in_flight(run.direction),
            None => self.settled,
        }
    }

    /// Reject a strict call whose terminal state already holds.
    pub fn ensure_not_reached(&self, direction: Direction) -> Result<(), LifecycleError> {
        if self.active.is_some() || !self.settled.has_reached(direction) {
            return Ok(());
        }
        Err(match direction {
            Direction::Start => LifecycleError::AlreadyStarted,
            Direction::Stop => LifecycleError::AlreadyStopped,
        })
    }

    /// Admit a call in `direction` whose outcome is delivered through `reply`.
    pub fn admit(&mut self, direction: Direction, reply: Reply) -> Admission {
        if let Some(run) = self.active.as_mut() {
            if run.direction == direction {
                run.waiters.push(reply);
                return Admission::Joined;
            }
            run.deferred.push((direction, reply));
            return Admission::Deferred;
        }

        let run_id = Uuid::now_v7();
        self.active = Some(ActiveRun {
            run_id,
            direction,
            started_at: Utc::now(),
            waiters: vec![reply],
            deferred: Vec::new(),
        });
        Admission::Run { run_id }
    }

    /// Settle the in-flight run and hand back its waiters.
    ///
    /// Returns `None` (and changes nothing) if `run_id` is not the active run.
    pub fn finish(&mut self, run_id: Uuid, succeeded: bool) -> Option<ActiveRun> {
        match self.active.take() {
            Some(run) if run.run_id == run_id => {
                self.settled = LifecyclePhase::settled(run.direction, succeeded);
                Some(run)
            }
            other => {
                self.active = other;
                None
            }
        }
    }
}
