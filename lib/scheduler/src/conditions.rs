//! Built-in schedule conditions.
//!
//! Conditions are declared on a trigger as a tagged list:
//!
//! ```json
//! [
//!   {"type": "expression", "expression": "{{ flow.namespace == 'prod' }}"},
//!   {"type": "day_of_week", "day_of_week": "Mon"},
//!   {"type": "date_time_between", "after": "2024-01-01T00:00:00Z"}
//! ]
//! ```
//!
//! Date-based conditions render `date` (default `{{ trigger.date }}`) and
//! look at the result in the offset it was rendered with.

use crate::condition::ScheduleCondition;
use crate::context::ConditionContext;
use crate::error::ConditionError;
use chrono::{DateTime, Datelike, FixedOffset, Utc, Weekday};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_DATE: &str = "{{ trigger.date }}";

fn default_date() -> String {
    DEFAULT_DATE.to_string()
}

/// A condition attached to a schedule trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// A template that must render to `true`.
    Expression { expression: String },
    /// The date falls on the given weekday.
    DayOfWeek {
        day_of_week: Weekday,
        #[serde(default = "default_date")]
        date: String,
    },
    /// The date falls on a Saturday or Sunday.
    Weekend {
        #[serde(default = "default_date")]
        date: String,
    },
    /// The date is strictly after `after` and strictly before `before`.
    /// A missing bound is open.
    DateTimeBetween {
        #[serde(default)]
        after: Option<DateTime<Utc>>,
        #[serde(default)]
        before: Option<DateTime<Utc>>,
        #[serde(default = "default_date")]
        date: String,
    },
    /// A condition supplied in code.
    #[serde(skip)]
    Custom(Arc<dyn ScheduleCondition>),
}

impl Condition {
    /// An expression condition.
    #[must_use]
    pub fn expression(expression: impl Into<String>) -> Self {
        Self::Expression {
            expression: expression.into(),
        }
    }

    /// A day-of-week condition on the trigger date.
    #[must_use]
    pub fn day_of_week(day_of_week: Weekday) -> Self {
        Self::DayOfWeek {
            day_of_week,
            date: default_date(),
        }
    }

    /// A weekend condition on the trigger date.
    #[must_use]
    pub fn weekend() -> Self {
        Self::Weekend {
            date: default_date(),
        }
    }

    /// A date window condition on the trigger date.
    #[must_use]
    pub fn between(after: Option<DateTime<Utc>>, before: Option<DateTime<Utc>>) -> Self {
        Self::DateTimeBetween {
            after,
            before,
            date: default_date(),
        }
    }

    /// Wraps a condition implemented in code.
    #[must_use]
    pub fn custom(condition: impl ScheduleCondition + 'static) -> Self {
        Self::Custom(Arc::new(condition))
    }

    /// Short name used in logs and errors.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Expression { .. } => "expression",
            Self::DayOfWeek { .. } => "day_of_week",
            Self::Weekend { .. } => "weekend",
            Self::DateTimeBetween { .. } => "date_time_between",
            Self::Custom(_) => "custom",
        }
    }

    fn render(&self, ctx: &ConditionContext, template: &str) -> Result<String, ConditionError> {
        ctx.render(template).map_err(|e| ConditionError::Render {
            condition: self.name().to_string(),
            reason: e.to_string(),
        })
    }

    fn render_date(
        &self,
        ctx: &ConditionContext,
        template: &str,
    ) -> Result<DateTime<FixedOffset>, ConditionError> {
        let rendered = self.render(ctx, template)?;
        DateTime::parse_from_rfc3339(rendered.trim()).map_err(|_| ConditionError::InvalidDate {
            condition: self.name().to_string(),
            value: rendered,
        })
    }
}

impl ScheduleCondition for Condition {
    fn test(&self, ctx: &ConditionContext) -> Result<bool, Report<ConditionError>> {
        match self {
            Self::Expression { expression } => {
                let rendered = self.render(ctx, expression)?;
                match rendered.trim() {
                    "true" => Ok(true),
                    "false" => Ok(false),
                    other => Err(ConditionError::NotBoolean {
                        condition: self.name().to_string(),
                        value: other.to_string(),
                    }
                    .into()),
                }
            }
            Self::DayOfWeek { day_of_week, date } => {
                Ok(self.render_date(ctx, date)?.weekday() == *day_of_week)
            }
            Self::Weekend { date } => Ok(matches!(
                self.render_date(ctx, date)?.weekday(),
                Weekday::Sat | Weekday::Sun
            )),
            Self::DateTimeBetween {
                after,
                before,
                date,
            } => {
                let date = self.render_date(ctx, date)?.with_timezone(&Utc);
                Ok(after.is_none_or(|after| date > after) && before.is_none_or(|before| date < before))
            }
            Self::Custom(condition) => condition.test(ctx),
        }
    }
}
