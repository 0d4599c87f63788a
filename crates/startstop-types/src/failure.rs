//! Step outcomes and the failure set aggregated over one run.

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::error::StepError;

/// A failing step paired with the error its action produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    /// Name of the step that failed.
    pub step: String,
    /// The error returned by the step's action.
    pub error: StepError,
}

impl StepOutcome {
    pub fn new(step: impl Into<String>, error: StepError) -> Self {
        Self {
            step: step.into(),
            error,
        }
    }
}

/// Every failing step of a run, in the order failures were observed.
///
/// Never empty: a run that produced no failing outcome succeeded and has no
/// failure set. The first entry is the first step observed to complete with
/// an error, which is not necessarily the first in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureSet {
    failures: Vec<StepOutcome>,
}

impl FailureSet {
    /// Build a failure set from collected outcomes; `None` when there are none.
    pub fn from_outcomes(failures: Vec<StepOutcome>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self { failures })
        }
    }

    /// The first failure observed.
    pub fn failure(&self) -> &StepOutcome {
        &self.failures[0]
    }

    /// All failures, in observation order.
    pub fn failures(&self) -> &[StepOutcome] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// A failure set is never empty.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Names of the failing steps, in observation order.
    pub fn step_names(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.step.as_str()).collect()
    }
}

impl fmt::Display for FailureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = self.failure();
        write!(f, "step '{}' failed: {}", first.step, first.error)?;
        if self.failures.len() > 1 {
            write!(f, " (and {} more)", self.failures.len() - 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for FailureSet {}

impl Serialize for FailureSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FailureSet", 2)?;
        state.serialize_field("failure", self.failure())?;
        state.serialize_field("failures", &self.failures)?;
        state.end()
    }
}
