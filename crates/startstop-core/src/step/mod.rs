//! Steps and the trees that order them.
//!
//! - `Step` -- a named unit of work with optional start and stop actions
//! - `tree` -- `StepTree` / `StepNode`, the nested batch-and-barrier structure
//! - `plan` -- read-only view of the stages a run walks

pub mod plan;
pub mod tree;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use startstop_types::{Direction, StepError};

pub use plan::Stage;
pub use tree::{StepNode, StepTree};

/// Future returned by a step action.
pub type ActionFuture = BoxFuture<'static, Result<(), StepError>>;

/// A start or stop action. Invoked once per run; each call yields a fresh future.
pub type StepAction = Arc<dyn Fn() -> ActionFuture + Send + Sync>;

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// An object that owns both halves of a step's lifecycle.
///
/// `Step::for_service` turns a shared service into a step whose actions run
/// against that service, which acts as the step's execution context.
pub trait Service: Send + Sync + 'static {
    fn start(&self) -> impl Future<Output = Result<(), StepError>> + Send;

    fn stop(&self) -> impl Future<Output = Result<(), StepError>> + Send;
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// A named unit of work with optional start and stop actions.
///
/// A step without an action for the requested direction is a no-op: it is
/// still announced on the event bus and still counts toward its batch.
#[derive(Clone)]
pub struct Step {
    name: String,
    start: Option<StepAction>,
    stop: Option<StepAction>,
}

impl Step {
    /// A step with no actions.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: None,
            stop: None,
        }
    }

    /// Set the start action.
    pub fn on_start<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), StepError>> + Send + 'static,
    {
        self.start = Some(boxed_action(action));
        self
    }

    /// Set the stop action.
    pub fn on_stop<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), StepError>> + Send + 'static,
    {
        self.stop = Some(boxed_action(action));
        self
    }

    /// A step whose start and stop actions delegate to `service`.
    pub fn for_service<S: Service>(name: impl Into<String>, service: Arc<S>) -> Self {
        let on_start = Arc::clone(&service);
        let on_stop = service;
        Self::new(name)
            .on_start(move || {
                let service = Arc::clone(&on_start);
                async move { service.start().await }
            })
            .on_stop(move || {
                let service = Arc::clone(&on_stop);
                async move { service.stop().await }
            })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The action for `direction`, if the step has one.
    pub fn action(&self, direction: Direction) -> Option<&StepAction> {
        match direction {
            Direction::Start => self.start.as_ref(),
            Direction::Stop => self.stop.as_ref(),
        }
    }

    pub fn has_action(&self, direction: Direction) -> bool {
        self.action(direction).is_some()
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("start", &self.start.is_some())
            .field("stop", &self.stop.is_some())
            .finish()
    }
}

fn boxed_action<F, Fut>(action: F) -> StepAction
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), StepError>> + Send + 'static,
{
    Arc::new(move || -> ActionFuture { Box::pin(action()) })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    impl Service for Counter {
        async fn start(&self) -> Result<(), StepError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) -> Result<(), StepError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Err(StepError::msg("refusing to stop"))
        }
    }

    #[test]
    fn new_step_has_no_actions() {
        let step = Step::new("idle");
        assert_eq!(step.name(), "idle");
        assert!(!step.has_action(Direction::Start));
        assert!(!step.has_action(Direction::Stop));
    }

    #[tokio::test]
    async fn action_is_selected_by_direction() {
        let step = Step::new("db")
            .on_start(|| async { Ok(()) })
            .on_stop(|| async { Err(StepError::msg("stop failed")) });

        let start = step.action(Direction::Start).unwrap();
        assert!(start().await.is_ok());

        let stop = step.action(Direction::Stop).unwrap();
        assert_eq!(stop().await.unwrap_err().to_string(), "stop failed");
    }

    #[tokio::test]
    async fn service_step_runs_against_shared_service() {
        let counter = Arc::new(Counter::default());
        let step = Step::for_service("counter", Arc::clone(&counter));

        let start = step.action(Direction::Start).unwrap();
        start().await.unwrap();
        start().await.unwrap();
        let stop = step.action(Direction::Stop).unwrap();
        assert!(stop().await.is_err());

        assert_eq!(counter.starts.load(Ordering::SeqCst), 2);
        assert_eq!(counter.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn debug_shows_action_presence() {
        let step = Step::new("cache").on_start(|| async { Ok(()) });
        let debug = format!("{step:?}");
        assert!(debug.contains("cache"));
        assert!(debug.contains("start: true"));
        assert!(debug.contains("stop: false"));
    }
}
