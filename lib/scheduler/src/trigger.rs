//! The schedule trigger definitions a flow can declare.

use crate::context::ConditionContext;
use crate::cron_schedule::CronSchedule;
use crate::date_schedule::DateSchedule;
use crate::error::ScheduleError;
use crate::schedulable::{Schedulable, TriggerOptions};
use crate::trigger_context::TriggerContext;
use cadence_flow::ExecutionRequest;
use chrono::{DateTime, Utc};
use rootcause::Report;
use serde::{Deserialize, Serialize};

/// A time-driven trigger, tagged by `type`.
///
/// ```json
/// {"type": "schedule", "id": "nightly", "cron": "0 2 * * *"}
/// {"type": "schedule_on_dates", "id": "releases", "dates": ["2024-03-01T00:00:00Z"]}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleTrigger {
    /// Recurring cron trigger.
    Schedule(CronSchedule),
    /// Explicit date list.
    ScheduleOnDates(DateSchedule),
}

impl ScheduleTrigger {
    fn inner(&self) -> &dyn Schedulable {
        match self {
            Self::Schedule(schedule) => schedule,
            Self::ScheduleOnDates(schedule) => schedule,
        }
    }
}

impl From<CronSchedule> for ScheduleTrigger {
    fn from(schedule: CronSchedule) -> Self {
        Self::Schedule(schedule)
    }
}

impl From<DateSchedule> for ScheduleTrigger {
    fn from(schedule: DateSchedule) -> Self {
        Self::ScheduleOnDates(schedule)
    }
}

impl Schedulable for ScheduleTrigger {
    fn id(&self) -> &str {
        self.inner().id()
    }

    fn kind(&self) -> &'static str {
        self.inner().kind()
    }

    fn options(&self) -> &TriggerOptions {
        self.inner().options()
    }

    fn validate(&self) -> Result<(), Report<ScheduleError>> {
        self.inner().validate()
    }

    fn next_evaluation_date(
        &self,
        ctx: &ConditionContext,
        last: Option<&TriggerContext>,
    ) -> Option<DateTime<Utc>> {
        self.inner().next_evaluation_date(ctx, last)
    }

    fn previous_evaluation_date(&self, ctx: &ConditionContext) -> Option<DateTime<Utc>> {
        self.inner().previous_evaluation_date(ctx)
    }

    fn evaluate(
        &self,
        ctx: &ConditionContext,
        trigger: &TriggerContext,
    ) -> Option<ExecutionRequest> {
        self.inner().evaluate(ctx, trigger)
    }
}
