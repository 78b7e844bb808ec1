//! The `Result` alias shared by the cadence crates.
//!
//! Error enums live next to the code that raises them (`ScheduleError` in
//! the scheduler, `InputError` in the flow crate, `PlannerError` in the
//! planner). A failure travels as a `rootcause::Report` of that enum.

use rootcause::Report;

/// Result of a fallible cadence operation whose error is described by `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
