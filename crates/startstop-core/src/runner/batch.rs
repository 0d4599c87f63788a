//! Concurrent execution of one batch of steps.
//!
//! Every step of the batch is spawned onto a `tokio::task::JoinSet` before
//! any of them is awaited. Results are drained in completion order, so the
//! failure set lists failures in the order they were observed.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;

use futures_util::{FutureExt, future};
use startstop_types::{FailureSet, StepError, StepOutcome};
use tokio::task::JoinSet;

use super::context::RunContext;
use crate::step::Step;

/// Run `batch` concurrently and collect its failures.
///
/// Returns `Ok(())` only when every step succeeded. An empty batch still
/// yields to the scheduler once before completing.
pub(crate) async fn run_batch(ctx: &RunContext, batch: Vec<&Step>) -> Result<(), FailureSet> {
    if batch.is_empty() {
        tokio::task::yield_now().await;
        return Ok(());
    }

    tracing::debug!(
        run_id = %ctx.run_id,
        direction = %ctx.direction,
        steps = batch.len(),
        "running batch"
    );

    // Steps still in progress, keyed by their position in the batch.
    let mut pending: BTreeMap<usize, String> = BTreeMap::new();
    let mut join_set = JoinSet::new();

    for (index, step) in batch.into_iter().enumerate() {
        pending.insert(index, step.name().to_string());
        let step = step.clone();
        let step_ctx = ctx.clone();
        join_set.spawn(async move {
            let error = run_step(&step_ctx, &step).await;
            (index, error)
        });
    }

    let mut failures = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, error)) => {
                let Some(name) = pending.remove(&index) else {
                    continue;
                };
                if let Some(error) = error {
                    failures.push(StepOutcome::new(name, error));
                }
            }
            Err(join_err) => {
                tracing::error!(run_id = %ctx.run_id, error = %join_err, "step task did not complete");
            }
        }
    }

    // Anything left never reported back (its task was aborted).
    for (_, name) in pending {
        failures.push(StepOutcome::new(
            name,
            StepError::msg("step task was aborted before completing"),
        ));
    }

    match FailureSet::from_outcomes(failures) {
        Some(set) => Err(set),
        None => Ok(()),
    }
}

/// Run one step's action for the context's direction, publishing its events.
///
/// A missing action is an immediate no-op. A panicking action becomes a
/// step error.
async fn run_step(ctx: &RunContext, step: &Step) -> Option<StepError> {
    ctx.step_begin(step.name());

    let result = match step.action(ctx.direction) {
        // The closure itself may panic before handing back a future.
        Some(action) => AssertUnwindSafe(future::lazy(|_| action()).flatten())
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(StepError::msg(panic_message(panic.as_ref())))),
        None => Ok(()),
    };

    ctx.step_end(step.name());

    let error = result.err();
    match &error {
        None => tracing::debug!(
            run_id = %ctx.run_id,
            step = step.name(),
            direction = %ctx.direction,
            "step succeeded"
        ),
        Some(err) => tracing::warn!(
            run_id = %ctx.run_id,
            step = step.name(),
            direction = %ctx.direction,
            error = %err,
            "step failed"
        ),
    }
    ctx.step_outcome(step.name(), error.as_ref());
    error
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("step panicked: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("step panicked: {msg}")
    } else {
        "step panicked".to_string()
    }
}
