//! Error types for the scheduler crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ScheduleError`: invalid trigger definitions (fail fast at validation)
//! - `RenderError`: template rendering failures
//! - `ConditionError`: schedule condition evaluation failures (recovered)
//! - `BackfillError`: invalid backfill requests
//! - `BuildError`: execution construction failures (become failed executions)

use chrono::{DateTime, Utc};
use std::fmt;

/// Errors in a schedule definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Invalid cron expression.
    InvalidCronExpression { expression: String, reason: String },
    /// Invalid timezone.
    InvalidTimezone { timezone: String },
    /// A date in a date list could not be parsed.
    InvalidDate { value: String, reason: String },
    /// A date-list trigger without any date.
    EmptyDateList,
    /// The late maximum delay does not fit in a calendar duration.
    InvalidLateMaximumDelay { reason: String },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCronExpression { expression, reason } => {
                write!(f, "invalid cron expression '{expression}': {reason}")
            }
            Self::InvalidTimezone { timezone } => {
                write!(f, "invalid timezone: {timezone}")
            }
            Self::InvalidDate { value, reason } => {
                write!(f, "invalid schedule date '{value}': {reason}")
            }
            Self::EmptyDateList => write!(f, "date list is empty"),
            Self::InvalidLateMaximumDelay { reason } => {
                write!(f, "invalid late maximum delay: {reason}")
            }
        }
    }
}

impl std::error::Error for ScheduleError {}

/// Errors from template rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The template failed to parse or to render.
    Template { template: String, reason: String },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template { template, reason } => {
                write!(f, "failed to render '{template}': {reason}")
            }
        }
    }
}

impl std::error::Error for RenderError {}

/// Errors from evaluating a schedule condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionError {
    /// The condition's template could not be rendered.
    Render { condition: String, reason: String },
    /// A rendered date could not be parsed.
    InvalidDate { condition: String, value: String },
    /// An expression did not render to `true` or `false`.
    NotBoolean { condition: String, value: String },
}

impl fmt::Display for ConditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Render { condition, reason } => {
                write!(f, "{condition} condition failed to render: {reason}")
            }
            Self::InvalidDate { condition, value } => {
                write!(f, "{condition} condition got an invalid date: '{value}'")
            }
            Self::NotBoolean { condition, value } => {
                write!(f, "{condition} condition expected a boolean, got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConditionError {}

/// Errors from creating a backfill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackfillError {
    /// The window ends before it starts.
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl fmt::Display for BackfillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidWindow { start, end } => {
                write!(f, "backfill end {end} is before its start {start}")
            }
        }
    }
}

impl std::error::Error for BackfillError {}

/// Errors while building an execution from an accepted occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A trigger or backfill label could not be rendered.
    Labels { reason: String },
    /// Inputs could not be rendered or resolved.
    Inputs { reason: String },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Labels { reason } => write!(f, "failed to build labels: {reason}"),
            Self::Inputs { reason } => write!(f, "failed to build inputs: {reason}"),
        }
    }
}

impl std::error::Error for BuildError {}
