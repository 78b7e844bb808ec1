//! Scheduler tuning knobs.
//!
//! Loaded by the embedding application (see the planner binary) through the
//! `config` crate; every field has a default so an empty source is valid.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Limits applied by the scheduling engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Years around the current year that condition-aware occurrence searches
    /// may explore before giving up.
    #[serde(default = "default_search_window_years")]
    pub search_window_years: i32,

    /// How far in the future an occurrence may be and still fire, in seconds.
    #[serde(default = "default_future_tolerance_seconds")]
    pub future_tolerance_seconds: i64,
}

fn default_search_window_years() -> i32 {
    10
}

fn default_future_tolerance_seconds() -> i64 {
    1
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            search_window_years: default_search_window_years(),
            future_tolerance_seconds: default_future_tolerance_seconds(),
        }
    }
}

impl SchedulerConfig {
    /// Returns the future tolerance as a duration.
    #[must_use]
    pub fn future_tolerance(&self) -> Duration {
        Duration::seconds(self.future_tolerance_seconds)
    }
}
