//! Time-driven trigger scheduling for cadence flows.
//!
//! This crate provides:
//!
//! - **Occurrences**: cron expressions (with timezones) and explicit date lists
//! - **Conditions**: boolean predicates gating occurrences, and the gate that
//!   searches for the next accepted one
//! - **Backfill**: replay of a past window before returning to real time
//! - **Schedulables**: the cron and date-list triggers, deciding when to fire
//!   and building the resulting execution request
//!
//! The crate holds no state between calls. A driver persists each trigger's
//! [`TriggerContext`], calls [`Schedulable::evaluate`] when it is due and
//! stores the context advanced to [`Schedulable::next_evaluation_date`].

pub mod backfill;
pub mod clock;
pub mod condition;
pub mod conditions;
pub mod config;
pub mod context;
pub mod cron_schedule;
pub mod date_schedule;
pub mod error;
pub mod execution_builder;
pub mod occurrence;
pub mod render;
pub mod schedulable;
pub mod trigger;
pub mod trigger_context;

pub use backfill::Backfill;
pub use clock::{Clock, FakeClock, SystemClock};
pub use condition::{ConditionGate, Direction, ScheduleCondition};
pub use conditions::Condition;
pub use config::SchedulerConfig;
pub use context::{ConditionContext, Output, Services};
pub use cron_schedule::CronSchedule;
pub use date_schedule::DateSchedule;
pub use error::{BackfillError, BuildError, ConditionError, RenderError, ScheduleError};
pub use execution_builder::ExecutionBuilder;
pub use occurrence::{CronOccurrences, DateOccurrences, OccurrenceSource};
pub use render::{MinijinjaRenderer, Renderer};
pub use schedulable::{Schedulable, TriggerOptions};
pub use trigger::ScheduleTrigger;
pub use trigger_context::TriggerContext;
