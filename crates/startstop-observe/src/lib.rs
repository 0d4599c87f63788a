//! Observability setup for startstop binaries.

pub mod tracing_setup;

pub use tracing_setup::{TracingError, init_tracing, shutdown_tracing};
