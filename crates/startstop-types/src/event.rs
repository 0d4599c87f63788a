//! Event types for the startstop event bus.
//!
//! `LifecycleEvent` is the unified event type broadcast while a controller
//! runs its step tree. All variants are Clone + Send + Sync for use with
//! tokio broadcast channels, and each carries the id of the run that
//! produced it so observers can tell overlapping runs apart.

use serde::Serialize;
use uuid::Uuid;

use crate::direction::Direction;
use crate::error::StepError;
use crate::failure::FailureSet;

/// Events emitted by a lifecycle controller and its runner.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A start run finished with every step succeeding.
    Started { run_id: Uuid },

    /// A stop run finished with every step succeeding.
    Stopped { run_id: Uuid },

    /// A run failed (`start-error` / `stop-error`).
    ActionFailed {
        run_id: Uuid,
        direction: Direction,
        failures: FailureSet,
    },

    /// Generic failure notification emitted alongside `ActionFailed`.
    Error {
        run_id: Uuid,
        direction: Direction,
        failures: FailureSet,
    },

    /// Any run finished, successfully or not. Emitted after every waiting
    /// completion has been resolved.
    RunCompleted {
        run_id: Uuid,
        direction: Direction,
        failures: Option<FailureSet>,
    },

    /// A step's action is about to be invoked.
    StepBegin {
        run_id: Uuid,
        direction: Direction,
        step: String,
    },

    /// A step's action returned.
    StepEnd {
        run_id: Uuid,
        direction: Direction,
        step: String,
    },

    /// A step's action succeeded (`step-started` / `step-stopped`).
    StepSucceeded {
        run_id: Uuid,
        direction: Direction,
        step: String,
    },

    /// A step's action failed.
    StepFailed {
        run_id: Uuid,
        direction: Direction,
        step: String,
        error: StepError,
    },

    /// A step finished, whatever the outcome.
    StepCompleted {
        run_id: Uuid,
        direction: Direction,
        step: String,
        error: Option<StepError>,
    },
}

impl LifecycleEvent {
    /// Canonical event name, e.g. `step-start-begin` or `run-completed`.
    pub fn name(&self) -> String {
        match self {
            LifecycleEvent::Started { .. } => "started".to_string(),
            LifecycleEvent::Stopped { .. } => "stopped".to_string(),
            LifecycleEvent::ActionFailed { direction, .. } => format!("{direction}-error"),
            LifecycleEvent::Error { .. } => "error".to_string(),
            LifecycleEvent::RunCompleted { .. } => "run-completed".to_string(),
            LifecycleEvent::StepBegin { direction, .. } => format!("step-{direction}-begin"),
            LifecycleEvent::StepEnd { direction, .. } => format!("step-{direction}-end"),
            LifecycleEvent::StepSucceeded { direction, .. } => {
                format!("step-{}", direction.finish_name())
            }
            LifecycleEvent::StepFailed { direction, .. } => format!("step-{direction}-error"),
            LifecycleEvent::StepCompleted { .. } => "step".to_string(),
        }
    }

    /// Id of the run that produced this event.
    pub fn run_id(&self) -> Uuid {
        match self {
            LifecycleEvent::Started { run_id }
            | LifecycleEvent::Stopped { run_id }
            | LifecycleEvent::ActionFailed { run_id, .. }
            | LifecycleEvent::Error { run_id, .. }
            | LifecycleEvent::RunCompleted { run_id, .. }
            | LifecycleEvent::StepBegin { run_id, .. }
            | LifecycleEvent::StepEnd { run_id, .. }
            | LifecycleEvent::StepSucceeded { run_id, .. }
            | LifecycleEvent::StepFailed { run_id, .. }
            | LifecycleEvent::StepCompleted { run_id, .. } => *run_id,
        }
    }

    /// Direction of the run that produced this event.
    pub fn direction(&self) -> Direction {
        match self {
            LifecycleEvent::Started { .. } => Direction::Start,
            LifecycleEvent::Stopped { .. } => Direction::Stop,
            LifecycleEvent::ActionFailed { direction, .. }
            | LifecycleEvent::Error { direction, .. }
            | LifecycleEvent::RunCompleted { direction, .. }
            | LifecycleEvent::StepBegin { direction, .. }
            | LifecycleEvent::StepEnd { direction, .. }
            | LifecycleEvent::StepSucceeded { direction, .. }
            | LifecycleEvent::StepFailed { direction, .. }
            | LifecycleEvent::StepCompleted { direction, .. } => *direction,
        }
    }

    /// Name of the step this event concerns, for per-step events.
    pub fn step(&self) -> Option<&str> {
        match self {
            LifecycleEvent::StepBegin { step, .. }
            | LifecycleEvent::StepEnd { step, .. }
            | LifecycleEvent::StepSucceeded { step, .. }
            | LifecycleEvent::StepFailed { step, .. }
            | LifecycleEvent::StepCompleted { step, .. } => Some(step),
            _ => None,
        }
    }
}
