//! Controller configuration.
//!
//! `ControllerConfig` is the `[settings]` table of a startstop manifest. All
//! fields have defaults, so an empty table (or no table) is valid.

use serde::{Deserialize, Serialize};

/// Order in which a stop run walks the step tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopOrder {
    /// Stop walks the tree in the same order as start.
    #[default]
    Declared,
    /// Stop walks the tree with its top-level entries reversed.
    Reversed,
}

/// Settings for a lifecycle controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    /// Capacity of the broadcast event channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Order of the stop run.
    #[serde(default)]
    pub stop_order: StopOrder,
}

fn default_event_capacity() -> usize {
    1024
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
            stop_order: StopOrder::default(),
        }
    }
}
