//! Planner configuration, loaded via the `config` crate from environment
//! variables prefixed with `CADENCE_`.
//!
//! Nested keys use `__`, e.g. `CADENCE_SCHEDULER__SEARCH_WINDOW_YEARS=5`.

use cadence_scheduler::SchedulerConfig;
use config::builder::{ConfigBuilder, DefaultState};
use serde::Deserialize;

/// Planner configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PlannerConfig {
    /// Number of evaluation dates to plan.
    #[serde(default = "default_count")]
    pub count: usize,

    /// Engine limits.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

fn default_count() -> usize {
    5
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl PlannerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(config::Config::builder().add_source(
            config::Environment::with_prefix("CADENCE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        ))
    }

    fn load(builder: ConfigBuilder<DefaultState>) -> Result<Self, config::ConfigError> {
        builder.build()?.try_deserialize()
    }
}
