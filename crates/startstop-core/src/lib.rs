//! Step-tree runner and lifecycle controller.
//!
//! A [`StepTree`] is an ordered list of [`Step`]s and nested trees. Adjacent
//! steps run concurrently as one batch; a nested tree is a barrier between
//! the steps before it and the steps after it. The [`TreeRunner`] walks a
//! tree in one direction, and the [`LifecycleController`] wraps it with
//! start/stop state, re-entrancy guards, and an [`EventBus`].
//!
//! Depends only on `startstop-types` and the tokio runtime.

pub mod event;
pub mod lifecycle;
pub mod runner;
pub mod step;

pub use event::EventBus;
pub use lifecycle::{Completion, LifecycleController};
pub use runner::TreeRunner;
pub use step::{Service, Stage, Step, StepAction, StepNode, StepTree};
