//! Recurring triggers driven by a cron expression.

use crate::context::ConditionContext;
use crate::error::ScheduleError;
use crate::occurrence::CronOccurrences;
use crate::schedulable::{Engine, Schedulable, TriggerOptions};
use crate::trigger_context::TriggerContext;
use cadence_flow::ExecutionRequest;
use chrono::{DateTime, Utc};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::error;

/// Trigger kind recorded on executions.
pub const KIND: &str = "schedule";

/// A trigger firing on every occurrence of a cron expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronSchedule {
    #[serde(flatten)]
    pub options: TriggerOptions,
    /// Five- or six-field cron expression, or a nickname such as `@daily`.
    pub cron: String,
    /// IANA timezone the expression is evaluated in. Defaults to UTC.
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(skip)]
    parsed: OnceLock<Result<CronOccurrences, ScheduleError>>,
}

impl CronSchedule {
    /// Creates and validates a cron trigger.
    ///
    /// # Errors
    ///
    /// Returns an error if the expression, timezone or late maximum delay is
    /// invalid.
    pub fn new(
        options: TriggerOptions,
        cron: impl Into<String>,
        timezone: Option<String>,
    ) -> Result<Self, Report<ScheduleError>> {
        let schedule = Self {
            options,
            cron: cron.into(),
            timezone,
            parsed: OnceLock::new(),
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// The parsed expression, parsed once per instance.
    ///
    /// # Errors
    ///
    /// Returns the parse error if the expression or timezone is invalid.
    pub fn occurrences(&self) -> Result<&CronOccurrences, Report<ScheduleError>> {
        self.parsed
            .get_or_init(|| CronOccurrences::try_parse(&self.cron, self.timezone.as_deref()))
            .as_ref()
            .map_err(|e| e.clone().into())
    }

    fn engine(&self) -> Option<Engine<'_, CronOccurrences>> {
        match self.occurrences() {
            Ok(source) => Some(Engine {
                kind: KIND,
                options: &self.options,
                source,
            }),
            Err(report) => {
                error!(trigger = %self.options.id, error = %report, "invalid cron trigger");
                None
            }
        }
    }
}

impl Schedulable for CronSchedule {
    fn id(&self) -> &str {
        &self.options.id
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    fn options(&self) -> &TriggerOptions {
        &self.options
    }

    fn validate(&self) -> Result<(), Report<ScheduleError>> {
        self.occurrences()?;
        self.options.late_delay()?;
        Ok(())
    }

    fn next_evaluation_date(
        &self,
        ctx: &ConditionContext,
        last: Option<&TriggerContext>,
    ) -> Option<DateTime<Utc>> {
        self.engine()?.next_evaluation_date(ctx, last)
    }

    fn previous_evaluation_date(&self, ctx: &ConditionContext) -> Option<DateTime<Utc>> {
        self.engine()?.previous_evaluation_date(ctx)
    }

    fn evaluate(
        &self,
        ctx: &ConditionContext,
        trigger: &TriggerContext,
    ) -> Option<ExecutionRequest> {
        self.engine()?.evaluate(ctx, trigger)
    }
}
