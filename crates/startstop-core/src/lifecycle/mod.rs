//! Lifecycle controller: start/stop over a step tree with re-entrancy guards.
//!
//! `LifecycleController` owns a `StepTree`, its lifecycle phase, and an
//! `EventBus`. `start()` and `stop()` act immediately on the phase and return
//! a [`Completion`]; the run itself executes on a spawned task.
//!
//! | Phase      | `start()`                      | `stop()`                        |
//! |------------|--------------------------------|---------------------------------|
//! | settled    | run start                      | run stop                        |
//! | `Starting` | join the in-flight start       | retry after the start completes |
//! | `Stopping` | retry after the stop completes | join the in-flight stop         |
//!
//! Repeating an operation whose terminal phase already holds runs the tree
//! again. `try_start()` / `try_stop()` reject that case instead.

pub mod completion;
pub(crate) mod state;

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use startstop_types::{
    ControllerConfig, Direction, FailureSet, LifecycleError, LifecycleEvent, LifecyclePhase,
    RunReport, StopOrder,
};
use tokio::sync::broadcast;
use tracing::Instrument;
use uuid::Uuid;

pub use completion::Completion;

use crate::event::EventBus;
use crate::runner::TreeRunner;
use crate::step::StepTree;
use completion::Reply;
use state::{Admission, StateMachine};

// ---------------------------------------------------------------------------
// LifecycleController
// ---------------------------------------------------------------------------

/// Start/stop controller for one step tree.
///
/// Cloning is cheap and yields a handle to the same controller. Every method
/// that starts work (`start`, `stop`, `try_start`, `try_stop`) must be called
/// from within a Tokio runtime.
#[derive(Clone)]
pub struct LifecycleController {
    inner: Arc<Inner>,
}

struct Inner {
    tree: StepTree,
    stop_tree: StepTree,
    config: ControllerConfig,
    bus: EventBus,
    runner: TreeRunner,
    state: Mutex<StateMachine>,
    last_run: Mutex<Option<RunReport>>,
}

impl LifecycleController {
    /// Create a controller with the default configuration.
    pub fn new(tree: StepTree) -> Self {
        Self::with_config(tree, ControllerConfig::default())
    }

    /// Create a controller with an explicit configuration.
    pub fn with_config(tree: StepTree, config: ControllerConfig) -> Self {
        let bus = EventBus::new(config.event_capacity);
        let stop_tree = match config.stop_order {
            StopOrder::Declared => tree.clone(),
            StopOrder::Reversed => tree.reversed(),
        };
        Self {
            inner: Arc::new(Inner {
                tree,
                stop_tree,
                config,
                runner: TreeRunner::new(bus.clone()),
                bus,
                state: Mutex::new(StateMachine::new()),
                last_run: Mutex::new(None),
            }),
        }
    }

    /// Start every step of the tree.
    ///
    /// Joins an in-flight start, or waits for an in-flight stop and then
    /// starts. Re-runs the start actions if already started.
    pub fn start(&self) -> Completion {
        self.request(Direction::Start)
    }

    /// Stop every step of the tree.
    ///
    /// Joins an in-flight stop, or waits for an in-flight start and then
    /// stops. Re-runs the stop actions if already stopped.
    pub fn stop(&self) -> Completion {
        self.request(Direction::Stop)
    }

    /// Like [`start`](Self::start), but fails with
    /// [`LifecycleError::AlreadyStarted`] when already started.
    pub fn try_start(&self) -> Result<Completion, LifecycleError> {
        self.try_request(Direction::Start)
    }

    /// Like [`stop`](Self::stop), but fails with
    /// [`LifecycleError::AlreadyStopped`] when already stopped.
    pub fn try_stop(&self) -> Result<Completion, LifecycleError> {
        self.try_request(Direction::Stop)
    }

    /// Subscribe to lifecycle and per-step events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.inner.bus.subscribe()
    }

    pub fn tree(&self) -> &StepTree {
        &self.inner.tree
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.lock_state().phase()
    }

    pub fn is_starting(&self) -> bool {
        self.phase().is_starting()
    }

    pub fn is_started(&self) -> bool {
        self.phase().is_started()
    }

    pub fn is_stopping(&self) -> bool {
        self.phase().is_stopping()
    }

    pub fn is_stopped(&self) -> bool {
        self.phase().is_stopped()
    }

    /// Report of the most recently completed run.
    pub fn last_run(&self) -> Option<RunReport> {
        self.inner
            .last_run
            .lock()
            .expect("last run lock poisoned")
            .clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, StateMachine> {
        self.inner.state.lock().expect("lifecycle state lock poisoned")
    }

    fn request(&self, direction: Direction) -> Completion {
        let (reply, completion) = Completion::channel();
        self.dispatch(direction, reply);
        completion
    }

    fn try_request(&self, direction: Direction) -> Result<Completion, LifecycleError> {
        let (reply, completion) = Completion::channel();
        let admission = {
            let mut state = self.lock_state();
            state.ensure_not_reached(direction)?;
            state.admit(direction, reply)
        };
        self.follow_up(direction, admission);
        Ok(completion)
    }

    fn dispatch(&self, direction: Direction, reply: Reply) {
        let admission = self.lock_state().admit(direction, reply);
        self.follow_up(direction, admission);
    }

    fn follow_up(&self, direction: Direction, admission: Admission) {
        match admission {
            Admission::Run { run_id } => {
                let this = self.clone();
                tokio::spawn(async move { this.execute(run_id, direction).await });
            }
            Admission::Joined => {
                tracing::debug!(direction = %direction, "joined in-flight run");
            }
            Admission::Deferred => {
                tracing::debug!(direction = %direction, "deferred behind in-flight run");
            }
        }
    }

    async fn execute(self, run_id: Uuid, direction: Direction) {
        let tree = match direction {
            Direction::Start => &self.inner.tree,
            Direction::Stop => &self.inner.stop_tree,
        };
        let span = tracing::info_span!("lifecycle_run", run_id = %run_id, direction = %direction);
        span.in_scope(|| tracing::info!(steps = tree.step_count(), "run started"));

        let outcome = self
            .inner
            .runner
            .run(run_id, tree, direction)
            .instrument(span.clone())
            .await;

        span.in_scope(|| self.complete(run_id, direction, outcome));
    }

    /// Settle state, notify, resolve completions, then retry deferred calls.
    fn complete(&self, run_id: Uuid, direction: Direction, outcome: Result<(), FailureSet>) {
        let finished = self.lock_state().finish(run_id, outcome.is_ok());
        let started_at = finished
            .as_ref()
            .map(|run| run.started_at)
            .unwrap_or_else(Utc::now);
        self.record(run_id, direction, started_at, &outcome);

        match &outcome {
            Ok(()) => {
                tracing::info!("run succeeded");
                self.inner.bus.publish(match direction {
                    Direction::Start => LifecycleEvent::Started { run_id },
                    Direction::Stop => LifecycleEvent::Stopped { run_id },
                });
            }
            Err(failures) => {
                tracing::warn!(
                    failed = failures.len(),
                    first = failures.failure().step.as_str(),
                    "run failed"
                );
                self.inner.bus.publish(LifecycleEvent::Error {
                    run_id,
                    direction,
                    failures: failures.clone(),
                });
                self.inner.bus.publish(LifecycleEvent::ActionFailed {
                    run_id,
                    direction,
                    failures: failures.clone(),
                });
            }
        }

        let (waiters, deferred) = match finished {
            Some(run) => (run.waiters, run.deferred),
            None => {
                tracing::error!("completed run was not the active run");
                (Vec::new(), Vec::new())
            }
        };

        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }

        self.inner.bus.publish(LifecycleEvent::RunCompleted {
            run_id,
            direction,
            failures: outcome.err(),
        });

        for (deferred_direction, reply) in deferred {
            self.dispatch(deferred_direction, reply);
        }
    }

    fn record(
        &self,
        run_id: Uuid,
        direction: Direction,
        started_at: DateTime<Utc>,
        outcome: &Result<(), FailureSet>,
    ) {
        let report = RunReport {
            run_id,
            direction,
            started_at,
            finished_at: Utc::now(),
            failures: outcome.as_ref().err().cloned(),
        };
        *self.inner.last_run.lock().expect("last run lock poisoned") = Some(report);
    }
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("phase", &self.phase())
            .field("steps", &self.inner.tree.step_count())
            .field("stop_order", &self.inner.config.stop_order)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Step;
    use startstop_types::StepError;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::time::Duration;

    type Log = Arc<Mutex<Vec<String>>>;

    fn new_log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    /// Step that logs `name:start` / `name:stop` after `delay_ms`.
    fn logging_step(name: &str, log: &Log, delay_ms: u64) -> Step {
        let start_log = Arc::clone(log);
        let stop_log = Arc::clone(log);
        let start_name = format!("{name}:start");
        let stop_name = format!("{name}:stop");
        Step::new(name)
            .on_start(move || {
                let log = Arc::clone(&start_log);
                let entry = start_name.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    log.lock().unwrap().push(entry);
                    Ok(())
                }
            })
            .on_stop(move || {
                let log = Arc::clone(&stop_log);
                let entry = stop_name.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    log.lock().unwrap().push(entry);
                    Ok(())
                }
            })
    }

    fn failing_step(name: &str, message: &'static str) -> Step {
        Step::new(name).on_start(move || async move { Err(StepError::msg(message)) })
    }

    fn drain(rx: &mut broadcast::Receiver<LifecycleEvent>) -> Vec<String> {
        let mut names = Vec::new();
        while let Ok(event) = rx.try_recv() {
            names.push(event.name());
        }
        names
    }

    #[tokio::test]
    async fn start_is_asynchronous_and_completes_after_all_steps() {
        let acc = Arc::new(AtomicU32::new(0));
        let tree: StepTree = [1u32, 2, 4]
            .into_iter()
            .map(|bit| {
                let acc = Arc::clone(&acc);
                Step::new(format!("step{bit}")).on_start(move || {
                    let acc = Arc::clone(&acc);
                    async move {
                        acc.fetch_or(bit, Ordering::SeqCst);
                        Ok(())
                    }
                })
            })
            .collect();
        let controller = LifecycleController::new(tree);

        let completion = controller.start();
        assert_eq!(acc.load(Ordering::SeqCst), 0);
        assert!(controller.is_starting());

        completion.await.unwrap();
        assert_eq!(acc.load(Ordering::SeqCst), 1 | 2 | 4);
        assert!(controller.is_started());
    }

    #[tokio::test]
    async fn each_step_raises_four_events() {
        let log = new_log();
        let controller = LifecycleController::new(
            StepTree::new()
                .step(logging_step("step1", &log, 0))
                .step(logging_step("step2", &log, 0))
                .step(logging_step("step3", &log, 0)),
        );
        let mut rx = controller.subscribe();

        controller.start().await.unwrap();
        tokio::task::yield_now().await;

        let names = drain(&mut rx);
        for name in ["step-start-begin", "step-start-end", "step", "step-started"] {
            assert_eq!(names.iter().filter(|n| *n == name).count(), 3, "{name} in {names:?}");
        }
        assert_eq!(names.iter().filter(|n| *n == "started").count(), 1);
        assert_eq!(names.last().map(String::as_str), Some("run-completed"));
    }

    #[tokio::test]
    async fn failing_steps_raise_error_events() {
        let controller = LifecycleController::new(
            StepTree::new()
                .step(Step::new("step1").on_start(|| async { Ok(()) }))
                .step(failing_step("step2", "failed"))
                .step(failing_step("step3", "failed too")),
        );
        let mut rx = controller.subscribe();

        let err = controller.start().await.unwrap_err();
        tokio::task::yield_now().await;

        assert_eq!(err.failures().unwrap().len(), 2);
        let names = drain(&mut rx);
        assert_eq!(names.iter().filter(|n| *n == "step-start-error").count(), 2);
        assert_eq!(names.iter().filter(|n| *n == "start-error").count(), 1);
        assert_eq!(names.iter().filter(|n| *n == "error").count(), 1);
        assert!(!names.contains(&"started".to_string()));
        assert_eq!(controller.phase(), LifecyclePhase::Failed(Direction::Start));
        assert!(!controller.is_started());
        assert!(!controller.is_stopped());
    }

    #[tokio::test]
    async fn report_error_in_start_completion() {
        let stop_calls = Arc::new(AtomicUsize::new(0));
        let stop_step = |name: &str, start_fails: bool| {
            let stop_calls = Arc::clone(&stop_calls);
            Step::new(name)
                .on_start(move || async move {
                    if start_fails {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Err(StepError::msg("something wrong"))
                    } else {
                        Ok(())
                    }
                })
                .on_stop(move || {
                    let stop_calls = Arc::clone(&stop_calls);
                    async move {
                        stop_calls.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                })
        };
        let controller = LifecycleController::new(
            StepTree::new()
                .step(stop_step("step1", false))
                .step(stop_step("step2", true))
                .step(stop_step("step3", false)),
        );

        let err = controller.start().await.unwrap_err();
        let set = err.failures().unwrap();
        assert_eq!(set.failure().step, "step2");
        assert_eq!(set.failure().error.to_string(), "something wrong");
        assert_eq!(set.failures().len(), 1);
        assert_eq!(set.failures()[0].step, set.failure().step);
        assert_eq!(stop_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn errors_stop_execution_of_next_groups() {
        let called = Arc::new(AtomicUsize::new(0));
        let called_in_step = Arc::clone(&called);
        let controller = LifecycleController::new(
            StepTree::new()
                .step(failing_step("step1", "failed"))
                .group(StepTree::new().step(Step::new("step2").on_start(move || {
                    let called = Arc::clone(&called_in_step);
                    async move {
                        called.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }))),
        );

        let err = controller.start().await.unwrap_err();
        assert_eq!(err.failures().unwrap().failure().step, "step1");
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stop_runs_stop_actions_after_start() {
        let log = new_log();
        let controller = LifecycleController::new(
            StepTree::new()
                .step(logging_step("step1", &log, 0))
                .step(logging_step("step2", &log, 0))
                .step(logging_step("step3", &log, 0)),
        );

        controller.start().await.unwrap();
        controller.stop().await.unwrap();

        let stops = entries(&log).iter().filter(|e| e.ends_with(":stop")).count();
        assert_eq!(stops, 3);
        assert!(controller.is_stopped());
    }

    #[tokio::test]
    async fn stop_during_start_is_deferred_until_start_completes() {
        let log = new_log();
        let controller = LifecycleController::new(StepTree::new().step(logging_step("step1", &log, 50)));

        let start = controller.start();
        let stop = controller.stop();
        assert!(controller.is_starting());

        stop.await.unwrap();
        assert_eq!(entries(&log), vec!["step1:start", "step1:stop"]);
        assert!(controller.is_stopped());
        start.await.unwrap();
    }

    #[tokio::test]
    async fn start_during_stop_is_deferred_until_stop_completes() {
        let log = new_log();
        let controller = LifecycleController::new(StepTree::new().step(logging_step("svc", &log, 20)));
        controller.start().await.unwrap();

        let stop = controller.stop();
        let start = controller.start();
        assert!(controller.is_stopping());

        start.await.unwrap();
        stop.await.unwrap();
        assert_eq!(entries(&log), vec!["svc:start", "svc:stop", "svc:start"]);
        assert!(controller.is_started());
    }

    #[tokio::test]
    async fn start_during_start_joins_the_same_run() {
        let log = new_log();
        let controller = LifecycleController::new(StepTree::new().step(logging_step("svc", &log, 20)));

        let first = controller.start();
        let second = controller.start();

        second.await.unwrap();
        first.await.unwrap();
        assert_eq!(entries(&log), vec!["svc:start"]);
    }

    #[tokio::test]
    async fn repeated_start_reruns_the_tree() {
        let log = new_log();
        let controller = LifecycleController::new(StepTree::new().step(logging_step("svc", &log, 0)));

        controller.start().await.unwrap();
        controller.start().await.unwrap();

        assert_eq!(entries(&log), vec!["svc:start", "svc:start"]);
        assert!(controller.is_started());
    }

    #[tokio::test]
    async fn strict_calls_reject_redundant_operations() {
        let log = new_log();
        let controller = LifecycleController::new(StepTree::new().step(logging_step("svc", &log, 0)));

        assert!(matches!(controller.try_stop(), Err(LifecycleError::AlreadyStopped)));
        controller.try_start().unwrap().await.unwrap();
        assert!(matches!(controller.try_start(), Err(LifecycleError::AlreadyStarted)));
        controller.try_stop().unwrap().await.unwrap();

        assert_eq!(entries(&log), vec!["svc:start", "svc:stop"]);
    }

    #[tokio::test]
    async fn reversed_stop_order_walks_top_level_backwards() {
        let log = new_log();
        let config = ControllerConfig {
            stop_order: StopOrder::Reversed,
            ..ControllerConfig::default()
        };
        let controller = LifecycleController::with_config(
            StepTree::new()
                .step(logging_step("db", &log, 0))
                .group(StepTree::new().step(logging_step("api", &log, 0))),
            config,
        );

        controller.start().await.unwrap();
        controller.stop().await.unwrap();

        assert_eq!(
            entries(&log),
            vec!["db:start", "api:start", "api:stop", "db:stop"]
        );
    }

    #[tokio::test]
    async fn declared_stop_order_matches_start_order() {
        let log = new_log();
        let controller = LifecycleController::new(
            StepTree::new()
                .step(logging_step("db", &log, 0))
                .group(StepTree::new().step(logging_step("api", &log, 0))),
        );

        controller.start().await.unwrap();
        controller.stop().await.unwrap();

        assert_eq!(
            entries(&log),
            vec!["db:start", "api:start", "db:stop", "api:stop"]
        );
    }

    #[tokio::test]
    async fn run_completed_follows_the_completion() {
        let controller = LifecycleController::new(StepTree::new().step(failing_step("db", "down")));
        let mut rx = controller.subscribe();

        let _ = controller.start().await;
        let report = controller.last_run().unwrap();
        assert!(!report.succeeded());
        assert_eq!(report.direction, Direction::Start);

        let completed = loop {
            let event = rx.recv().await.unwrap();
            if let LifecycleEvent::RunCompleted { run_id, failures, .. } = event {
                break (run_id, failures);
            }
        };
        assert_eq!(completed.0, report.run_id);
        assert_eq!(completed.1.unwrap().failure().step, "db");
    }

    #[tokio::test]
    async fn dropping_the_completion_does_not_cancel_the_run() {
        let log = new_log();
        let controller = LifecycleController::new(StepTree::new().step(logging_step("svc", &log, 10)));

        drop(controller.start());
        controller.stop().await.unwrap();

        assert_eq!(entries(&log), vec!["svc:start", "svc:stop"]);
    }

    #[tokio::test]
    async fn step_without_action_still_counts() {
        let controller = LifecycleController::new(
            StepTree::new()
                .step(Step::new("noop"))
                .group(StepTree::new().step(Step::new("also-noop"))),
        );
        let mut rx = controller.subscribe();

        controller.start().await.unwrap();
        tokio::task::yield_now().await;

        let names = drain(&mut rx);
        assert_eq!(names.iter().filter(|n| *n == "step-started").count(), 2);
        assert!(controller.is_started());
    }

    #[tokio::test]
    async fn empty_groups_do_not_stall_the_controller() {
        let log = new_log();
        let controller = LifecycleController::new(
            StepTree::new()
                .group(StepTree::new())
                .group(StepTree::new().step(logging_step("c", &log, 0)))
                .step(logging_step("d", &log, 0)),
        );

        controller.start().await.unwrap();
        controller.stop().await.unwrap();

        assert_eq!(entries(&log), vec!["c:start", "d:start", "c:stop", "d:stop"]);
        assert!(controller.is_stopped());
    }

    #[test]
    fn new_controller_is_stopped() {
        let controller = LifecycleController::new(StepTree::new());
        assert!(controller.is_stopped());
        assert!(controller.last_run().is_none());
        assert!(format!("{controller:?}").contains("Stopped"));
    }
}
