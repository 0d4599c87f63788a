use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::failure::FailureSet;

type BoxedError = Box<dyn StdError + Send + Sync + 'static>;

/// Error produced by a single step action.
///
/// Opaque to the engine: the wrapped value is attached verbatim to the
/// step's outcome. Cloning shares the underlying error, so the same value can
/// travel through events, failure sets, and completions.
#[derive(Clone)]
pub struct StepError(Arc<dyn StdError + Send + Sync + 'static>);

impl StepError {
    /// Wrap any error value.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(Arc::new(error))
    }

    /// Build an error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(MessageError(message.into()))
    }

    /// Attempt to view the wrapped error as a concrete type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }
}

impl fmt::Debug for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for StepError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

/// Two step errors are equal when they share the same allocation or render
/// the same message.
impl PartialEq for StepError {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.to_string() == other.to_string()
    }
}

impl Serialize for StepError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<anyhow::Error> for StepError {
    fn from(error: anyhow::Error) -> Self {
        let boxed: BoxedError = error.into();
        Self(Arc::from(boxed))
    }
}

impl From<BoxedError> for StepError {
    fn from(error: BoxedError) -> Self {
        Self(Arc::from(error))
    }
}

impl From<String> for StepError {
    fn from(message: String) -> Self {
        Self::msg(message)
    }
}

impl From<&str> for StepError {
    fn from(message: &str) -> Self {
        Self::msg(message)
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct MessageError(String);

/// Errors surfaced by lifecycle operations.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    /// One or more steps failed during the run.
    #[error("{0}")]
    Failed(FailureSet),

    /// Strict start requested while already started.
    #[error("already started")]
    AlreadyStarted,

    /// Strict stop requested while already stopped.
    #[error("already stopped")]
    AlreadyStopped,

    /// The run ended without reporting an outcome (runtime shut down).
    #[error("lifecycle run was interrupted before reporting an outcome")]
    Interrupted,
}

impl LifecycleError {
    /// The failure set, when the run itself failed.
    pub fn failures(&self) -> Option<&FailureSet> {
        match self {
            LifecycleError::Failed(set) => Some(set),
            _ => None,
        }
    }
}

impl From<FailureSet> for LifecycleError {
    fn from(set: FailureSet) -> Self {
        LifecycleError::Failed(set)
    }
}
