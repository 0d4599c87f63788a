//! Nested step trees.
//!
//! A `StepTree` is an ordered list of nodes. Consecutive `StepNode::Step`
//! entries form a batch that runs concurrently; a `StepNode::Group` is a
//! barrier that runs after everything before it and before everything
//! after it. Groups nest to any depth.

use super::Step;
use super::plan::Stage;

/// One entry of a step tree.
#[derive(Debug, Clone)]
pub enum StepNode {
    Step(Step),
    Group(StepTree),
}

impl From<Step> for StepNode {
    fn from(step: Step) -> Self {
        StepNode::Step(step)
    }
}

impl From<StepTree> for StepNode {
    fn from(tree: StepTree) -> Self {
        StepNode::Group(tree)
    }
}

/// Ordered, arbitrarily nested sequence of steps and groups.
#[derive(Debug, Clone, Default)]
pub struct StepTree {
    nodes: Vec<StepNode>,
}

impl StepTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step to the current batch.
    pub fn step(mut self, step: Step) -> Self {
        self.nodes.push(StepNode::Step(step));
        self
    }

    /// Append a nested group (a barrier).
    pub fn group(mut self, group: StepTree) -> Self {
        self.nodes.push(StepNode::Group(group));
        self
    }

    pub fn nodes(&self) -> &[StepNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total number of steps at every depth.
    pub fn step_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| match node {
                StepNode::Step(_) => 1,
                StepNode::Group(group) => group.step_count(),
            })
            .sum()
    }

    /// Every step at every depth, in declaration order.
    pub fn steps(&self) -> Vec<&Step> {
        let mut out = Vec::with_capacity(self.nodes.len());
        collect_steps(&self.nodes, &mut out);
        out
    }

    /// Copy of this tree with its top-level entries in reverse order.
    ///
    /// Nested groups keep their internal order.
    pub fn reversed(&self) -> StepTree {
        StepTree {
            nodes: self.nodes.iter().rev().cloned().collect(),
        }
    }

    /// The stages a run walks, without executing anything.
    pub fn plan(&self) -> Vec<Stage> {
        plan_nodes(&self.nodes)
    }
}

impl FromIterator<StepNode> for StepTree {
    fn from_iter<I: IntoIterator<Item = StepNode>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<Step> for StepTree {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        iter.into_iter().map(StepNode::Step).collect()
    }
}

/// Split `nodes` into its leading batch of plain steps and the remainder.
///
/// The remainder is empty or starts with a group.
pub fn split_batch(nodes: &[StepNode]) -> (Vec<&Step>, &[StepNode]) {
    let boundary = nodes
        .iter()
        .position(|node| matches!(node, StepNode::Group(_)))
        .unwrap_or(nodes.len());
    let (batch, rest) = nodes.split_at(boundary);
    let steps = batch
        .iter()
        .filter_map(|node| match node {
            StepNode::Step(step) => Some(step),
            StepNode::Group(_) => None,
        })
        .collect();
    (steps, rest)
}

fn collect_steps<'a>(nodes: &'a [StepNode], out: &mut Vec<&'a Step>) {
    for node in nodes {
        match node {
            StepNode::Step(step) => out.push(step),
            StepNode::Group(group) => collect_steps(&group.nodes, out),
        }
    }
}

fn plan_nodes(nodes: &[StepNode]) -> Vec<Stage> {
    let mut stages = Vec::new();
    let mut remaining = nodes;
    while !remaining.is_empty() {
        let (batch, rest) = split_batch(remaining);
        if !batch.is_empty() {
            stages.push(Stage::Batch(
                batch.iter().map(|step| step.name().to_string()).collect(),
            ));
        }
        match rest.split_first() {
            Some((StepNode::Group(group), tail)) => {
                stages.push(Stage::Group(plan_nodes(&group.nodes)));
                remaining = tail;
            }
            _ => remaining = rest,
        }
    }
    stages
}
