//! Dry-run planner for cadence schedule triggers.
//!
//! Loads a JSON document holding a flow and one of its schedule triggers (and
//! optionally a backfill window), then simulates the driver loop to show when
//! the trigger would fire and what it would start.

pub mod config;
pub mod error;
pub mod plan;

pub use config::PlannerConfig;
pub use error::PlannerError;
pub use plan::{BackfillWindow, PlanDefinition, PlannedRun, load_definition, simulate};
