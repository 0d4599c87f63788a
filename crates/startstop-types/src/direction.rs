//! The two directions a lifecycle run can take.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which action of each step a run invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Start,
    Stop,
}

impl Direction {
    /// Action name used in event names (`"start"` / `"stop"`).
    pub fn action_name(self) -> &'static str {
        match self {
            Direction::Start => "start",
            Direction::Stop => "stop",
        }
    }

    /// Name of the terminal state reached on success (`"started"` / `"stopped"`).
    pub fn finish_name(self) -> &'static str {
        match self {
            Direction::Start => "started",
            Direction::Stop => "stopped",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action_name())
    }
}
