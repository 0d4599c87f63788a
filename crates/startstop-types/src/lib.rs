//! Shared domain types for startstop.
//!
//! This crate contains the types shared by the engine and its front ends:
//! lifecycle directions and phases, step and run errors, lifecycle events,
//! controller configuration, and run reports.
//!
//! No async runtime here; the engine lives in `startstop-core`.

pub mod config;
pub mod direction;
pub mod error;
pub mod event;
pub mod failure;
pub mod phase;
pub mod report;

pub use config::{ControllerConfig, StopOrder};
pub use direction::Direction;
pub use error::{LifecycleError, StepError};
pub use event::LifecycleEvent;
pub use failure::{FailureSet, StepOutcome};
pub use phase::LifecyclePhase;
pub use report::RunReport;
