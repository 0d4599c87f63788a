//! Per-run execution context.
//!
//! `RunContext` is created once per run and passed down the recursion. It
//! carries the run's identity and its notification surface; the
//! accumulators (pending steps, failures) live in each batch invocation, so
//! nothing mutable is shared between concurrent branches of a run.

use startstop_types::{Direction, LifecycleEvent, StepError};
use uuid::Uuid;

use crate::event::EventBus;

/// Identity and notification surface of one run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub direction: Direction,
    bus: EventBus,
}

impl RunContext {
    pub fn new(run_id: Uuid, direction: Direction, bus: EventBus) -> Self {
        Self {
            run_id,
            direction,
            bus,
        }
    }

    pub(crate) fn step_begin(&self, step: &str) {
        self.bus.publish(LifecycleEvent::StepBegin {
            run_id: self.run_id,
            direction: self.direction,
            step: step.to_string(),
        });
    }

    pub(crate) fn step_end(&self, step: &str) {
        self.bus.publish(LifecycleEvent::StepEnd {
            run_id: self.run_id,
            direction: self.direction,
            step: step.to_string(),
        });
    }

    /// Publish the success-or-failure event followed by the catch-all `step` event.
    pub(crate) fn step_outcome(&self, step: &str, error: Option<&StepError>) {
        let event = match error {
            None => LifecycleEvent::StepSucceeded {
                run_id: self.run_id,
                direction: self.direction,
                step: step.to_string(),
            },
            Some(error) => LifecycleEvent::StepFailed {
                run_id: self.run_id,
                direction: self.direction,
                step: step.to_string(),
                error: error.clone(),
            },
        };
        self.bus.publish(event);
        self.bus.publish(LifecycleEvent::StepCompleted {
            run_id: self.run_id,
            direction: self.direction,
            step: step.to_string(),
            error: error.cloned(),
        });
    }
}
