//! Read-only execution plan of a step tree.

use serde::Serialize;

/// One stage of a run: a concurrent batch or a nested barrier group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum Stage {
    /// Step names that run concurrently.
    Batch(Vec<String>),
    /// A nested tree that runs only after everything before it.
    Group(Vec<Stage>),
}

impl Stage {
    /// Number of steps in this stage at every depth.
    pub fn step_count(&self) -> usize {
        match self {
            Stage::Batch(names) => names.len(),
            Stage::Group(stages) => stages.iter().map(Stage::step_count).sum(),
        }
    }
}
