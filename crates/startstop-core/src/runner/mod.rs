//! Step-tree runner: batch-parallel, group-sequential tree execution.
//!
//! The `TreeRunner` walks a `StepTree` in one direction. At each position it
//! takes the leading batch of plain steps and runs them concurrently; when
//! the batch succeeds and the remainder starts with a nested group, it runs
//! that group as its own sub-run and then the siblings after it. Any failure
//! stops descent and becomes the run's result.
//!
//! # Execution flow
//!
//! 1. Split the current nodes into the leading batch and the remainder.
//! 2. Spawn every batch member, then wait for all of them.
//! 3. On failure, return the batch's failure set.
//! 4. Otherwise run the next group, then the nodes after it, recursively.

pub mod batch;
pub mod context;

use futures_util::future::BoxFuture;
use startstop_types::{Direction, FailureSet};
use uuid::Uuid;

pub use context::RunContext;

use crate::event::EventBus;
use crate::step::StepTree;
use crate::step::tree::split_batch;
use crate::step::StepNode;

// ---------------------------------------------------------------------------
// TreeRunner
// ---------------------------------------------------------------------------

/// Stateless executor for step trees.
///
/// Each call to [`TreeRunner::run`] is an independent computation; the runner
/// only holds the bus it publishes per-step events on.
#[derive(Debug, Clone)]
pub struct TreeRunner {
    bus: EventBus,
}

impl TreeRunner {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    /// Run every step of `tree` in `direction`.
    ///
    /// Resolves once the whole tree has finished or a failure cut it short.
    /// Steps in a batch always run to completion even when a sibling fails;
    /// batches and groups after a failure never run.
    pub async fn run(
        &self,
        run_id: Uuid,
        tree: &StepTree,
        direction: Direction,
    ) -> Result<(), FailureSet> {
        let ctx = RunContext::new(run_id, direction, self.bus.clone());
        tracing::debug!(
            run_id = %run_id,
            direction = %direction,
            steps = tree.step_count(),
            "running step tree"
        );
        run_nodes(&ctx, tree.nodes()).await
    }
}

/// Run a slice of nodes: leading batch, then the next group, then the rest.
fn run_nodes<'a>(ctx: &'a RunContext, nodes: &'a [StepNode]) -> BoxFuture<'a, Result<(), FailureSet>> {
    Box::pin(async move {
        let (batch, rest) = split_batch(nodes);
        batch::run_batch(ctx, batch).await?;

        match rest.split_first() {
            None => Ok(()),
            Some((StepNode::Group(group), tail)) => {
                run_nodes(ctx, group.nodes()).await?;
                run_nodes(ctx, tail).await
            }
            // `split_batch` leaves a remainder that starts with a group.
            Some((StepNode::Step(_), _)) => run_nodes(ctx, rest).await,
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
