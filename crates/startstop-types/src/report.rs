use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::direction::Direction;
use crate::failure::FailureSet;

/// Summary of one completed lifecycle run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub direction: Direction,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// `None` when every step succeeded.
    pub failures: Option<FailureSet>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.failures.is_none()
    }

    /// Wall-clock duration in milliseconds (zero if the clock went backwards).
    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}
