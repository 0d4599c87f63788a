//! Lifecycle phase of a controller.
//!
//! A single enum replaces the `starting` / `started` / `stopping` / `stopped`
//! flag quartet, so impossible combinations (e.g. starting and stopping at
//! once) cannot be represented. The flag views remain available as derived
//! accessors.

use serde::{Deserialize, Serialize};

use crate::direction::Direction;

/// Where a controller is in its start/stop lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    /// Initial state, and the state after a successful stop.
    #[default]
    Stopped,
    /// A start run is in flight.
    Starting,
    /// The last start run succeeded.
    Started,
    /// A stop run is in flight.
    Stopping,
    /// The last run in the given direction failed; neither terminal state holds.
    Failed(Direction),
}

impl LifecyclePhase {
    /// Phase while a run in `direction` is in flight.
    pub fn in_flight(direction: Direction) -> Self {
        match direction {
            Direction::Start => LifecyclePhase::Starting,
            Direction::Stop => LifecyclePhase::Stopping,
        }
    }

    /// Phase after a run in `direction` finished.
    pub fn settled(direction: Direction, succeeded: bool) -> Self {
        match (direction, succeeded) {
            (Direction::Start, true) => LifecyclePhase::Started,
            (Direction::Stop, true) => LifecyclePhase::Stopped,
            (direction, false) => LifecyclePhase::Failed(direction),
        }
    }

    /// Whether the terminal state of `direction` already holds.
    pub fn has_reached(self, direction: Direction) -> bool {
        self == LifecyclePhase::settled(direction, true)
    }

    pub fn is_starting(self) -> bool {
        self == LifecyclePhase::Starting
    }

    pub fn is_started(self) -> bool {
        self == LifecyclePhase::Started
    }

    pub fn is_stopping(self) -> bool {
        self == LifecyclePhase::Stopping
    }

    pub fn is_stopped(self) -> bool {
        self == LifecyclePhase::Stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_phase_is_stopped() {
        let phase = LifecyclePhase::default();
        assert!(phase.is_stopped());
        assert!(!phase.is_started());
        assert!(!phase.is_starting());
        assert!(!phase.is_stopping());
    }

    #[test]
    fn settled_phases() {
        assert_eq!(LifecyclePhase::settled(Direction::Start, true), LifecyclePhase::Started);
        assert_eq!(LifecyclePhase::settled(Direction::Stop, true), LifecyclePhase::Stopped);
        assert_eq!(
            LifecyclePhase::settled(Direction::Start, false),
            LifecyclePhase::Failed(Direction::Start)
        );
    }

    #[test]
    fn failed_phase_holds_no_flag() {
        let phase = LifecyclePhase::Failed(Direction::Stop);
        assert!(!phase.is_started());
        assert!(!phase.is_stopped());
        assert!(!phase.is_starting());
        assert!(!phase.is_stopping());
        assert!(!phase.has_reached(Direction::Stop));
    }

    #[test]
    fn in_flight_phases() {
        assert!(LifecyclePhase::in_flight(Direction::Start).is_starting());
        assert!(LifecyclePhase::in_flight(Direction::Stop).is_stopping());
    }

    #[test]
    fn has_reached_terminal_state() {
        assert!(LifecyclePhase::Started.has_reached(Direction::Start));
        assert!(!LifecyclePhase::Started.has_reached(Direction::Stop));
        assert!(LifecyclePhase::Stopped.has_reached(Direction::Stop));
    }
}
