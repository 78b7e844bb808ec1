//! Triggers firing on an explicit list of dates.

use crate::context::ConditionContext;
use crate::error::ScheduleError;
use crate::occurrence::DateOccurrences;
use crate::schedulable::{Engine, Schedulable, TriggerOptions};
use crate::trigger_context::TriggerContext;
use cadence_flow::ExecutionRequest;
use chrono::{DateTime, Utc};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::error;

/// Trigger kind recorded on executions.
pub const KIND: &str = "schedule_on_dates";

/// A trigger firing once at each listed date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateSchedule {
    #[serde(flatten)]
    pub options: TriggerOptions,
    /// RFC 3339 timestamps, in any order and offset.
    pub dates: Vec<String>,
    #[serde(skip)]
    parsed: OnceLock<Result<DateOccurrences, ScheduleError>>,
}

impl DateSchedule {
    /// Creates and validates a date-list trigger.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty, a date does not parse or the
    /// late maximum delay is invalid.
    pub fn new(options: TriggerOptions, dates: Vec<String>) -> Result<Self, Report<ScheduleError>> {
        let schedule = Self {
            options,
            dates,
            parsed: OnceLock::new(),
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// The parsed dates, parsed once per instance.
    ///
    /// # Errors
    ///
    /// Returns the parse error if the list is invalid.
    pub fn occurrences(&self) -> Result<&DateOccurrences, Report<ScheduleError>> {
        self.parsed
            .get_or_init(|| DateOccurrences::try_parse(self.dates.as_slice()))
            .as_ref()
            .map_err(|e| e.clone().into())
    }

    fn engine(&self) -> Option<Engine<'_, DateOccurrences>> {
        match self.occurrences() {
            Ok(source) => Some(Engine {
                kind: KIND,
                options: &self.options,
                source,
            }),
            Err(report) => {
                error!(trigger = %self.options.id, error = %report, "invalid date list trigger");
                None
            }
        }
    }
}

impl Schedulable for DateSchedule {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backfill::Backfill;
    use crate::clock::{Clock, FakeClock};
    use crate::context::Services;
    use cadence_flow::Flow;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn utc(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, 0, 0, 0)
            .single()
            .expect("valid date")
    }

    fn schedule() -> DateSchedule {
        DateSchedule::new(
            TriggerOptions::new("releases"),
            vec![
                "2024-06-01T00:00:00Z".to_string(),
                "2024-03-01T00:00:00Z".to_string(),
            ],
        )
        .expect("valid schedule")
    }

    #[test]
    fn rejects_invalid_lists() {
        assert!(DateSchedule::new(TriggerOptions::new("t"), Vec::new()).is_err());
        assert!(DateSchedule::new(TriggerOptions::new("t"), vec!["soon".to_string()]).is_err());
    }

    #[test]
    fn progression_ends_after_last_date() {
        let flow = Flow::new("ns", "f");
        let clock = FakeClock::at(utc(2024, 1, 1));
        let ctx = ConditionContext::new(
            Arc::new(flow.clone()),
            Services::new().with_clock(clock.clone()),
        );
        let schedule = schedule();

        let first = schedule.next_evaluation_date(&ctx, None).expect("first");
        assert_eq!(first, utc(2024, 3, 1));
        let trigger = TriggerContext::for_flow(&flow, "releases", first);

        clock.set(utc(2024, 3, 1));
        let execution = schedule.evaluate(&ctx, &trigger).expect("fires");
        assert_eq!(execution.schedule_date, Some(utc(2024, 3, 1)));
        assert_eq!(execution.trigger.as_ref().map(|t| t.kind.as_str()), Some(KIND));

        let second = schedule
            .next_evaluation_date(&ctx, Some(&trigger))
            .expect("second");
        assert_eq!(second, utc(2024, 6, 1));
        let trigger = trigger.advance(second);

        clock.set(utc(2024, 6, 1) + Duration::minutes(5));
        let execution = schedule.evaluate(&ctx, &trigger).expect("fires");
        assert_eq!(execution.schedule_date, Some(utc(2024, 6, 1)));

        assert_eq!(schedule.next_evaluation_date(&ctx, Some(&trigger)), None);
    }

    #[test]
    fn first_date_is_inclusive_of_now() {
        let flow = Flow::new("ns", "f");
        let ctx = ConditionContext::new(
            Arc::new(flow),
            Services::new().with_clock(FakeClock::at(utc(2024, 3, 1))),
        );
        assert_eq!(
            schedule().next_evaluation_date(&ctx, None),
            Some(utc(2024, 3, 1))
        );
    }

    #[test]
    fn previous_is_largest_date_before_now() {
        let flow = Flow::new("ns", "f");
        let ctx = ConditionContext::new(
            Arc::new(flow),
            Services::new().with_clock(FakeClock::at(utc(2024, 7, 1))),
        );
        assert_eq!(
            schedule().previous_evaluation_date(&ctx),
            Some(utc(2024, 6, 1))
        );
    }

    #[test]
    fn deserializes_from_definition() {
        let schedule: DateSchedule = serde_json::from_value(serde_json::json!({
            "id": "releases",
            "dates": ["2024-03-01T01:00:00+01:00"],
        }))
        .expect("deserialize");

        assert!(schedule.validate().is_ok());
        assert_eq!(
            schedule.occurrences().expect("dates").dates(),
            &[utc(2024, 3, 1)]
        );
    }

    fn on_days(options: TriggerOptions, days: &[u32]) -> DateSchedule {
        let dates = days
            .iter()
            .map(|d| format!("2024-01-{d:02}T00:00:00Z"))
            .collect();
        DateSchedule::new(options, dates).expect("valid schedule")
    }

    fn ctx_at(flow: &Flow, now: DateTime<Utc>) -> ConditionContext {
        ConditionContext::new(
            Arc::new(flow.clone()),
            Services::new().with_clock(FakeClock::at(now)),
        )
    }

    #[test]
    fn finished_backfill_does_not_replay_dates_past_its_end() {
        let flow = Flow::new("ns", "f");
        let ctx = ctx_at(&flow, utc(2024, 1, 10));
        let schedule = on_days(TriggerOptions::new("releases"), &[1, 2, 5]);
        let backfill = Backfill::new(utc(2024, 1, 2), utc(2024, 1, 3)).expect("backfill");
        let trigger =
            TriggerContext::for_flow(&flow, "releases", utc(2024, 1, 10)).with_backfill(backfill);

        let execution = schedule.evaluate(&ctx, &trigger).expect("fires");
        assert_eq!(execution.schedule_date, Some(utc(2024, 1, 2)));

        // Jan 5th is outside the window and no date is left after now.
        assert_eq!(schedule.next_evaluation_date(&ctx, Some(&trigger)), None);
    }

    #[test]
    fn late_skip_with_every_remaining_date_too_late() {
        let flow = Flow::new("ns", "f");
        let ctx = ctx_at(&flow, utc(2024, 1, 10));
        let options = TriggerOptions::new("releases")
            .with_late_maximum_delay(std::time::Duration::from_secs(3600));
        let schedule = on_days(options, &[1, 2, 3]);

        let trigger = TriggerContext::for_flow(&flow, "releases", utc(2024, 1, 1));
        assert!(schedule.evaluate(&ctx, &trigger).is_none());
        assert_eq!(schedule.next_evaluation_date(&ctx, Some(&trigger)), None);
    }

    #[test]
    fn next_evaluation_date_moves_past_its_anchor() {
        let flow = Flow::new("ns", "f");
        let clock = FakeClock::at(utc(2024, 1, 4));
        let ctx = ConditionContext::new(
            Arc::new(flow.clone()),
            Services::new().with_clock(clock.clone()),
        );
        let schedule = on_days(TriggerOptions::new("releases"), &[1, 2, 3, 5, 6, 8, 9]);
        let backfill = Backfill::new(utc(2024, 1, 1), utc(2024, 1, 3)).expect("backfill");
        let first = schedule.next_evaluation_date(&ctx, None).expect("first");
        let mut trigger =
            TriggerContext::for_flow(&flow, "releases", first).with_backfill(backfill);

        let mut fired = Vec::new();
        for step in 0..8 {
            if trigger.active_backfill().is_none() && trigger.date > clock.now() {
                clock.set(trigger.date);
            }
            if let Some(execution) = schedule.evaluate(&ctx, &trigger) {
                fired.push(execution.schedule_date.expect("schedule date"));
            }
            if step == 1 {
                trigger.backfill = trigger.backfill.take().map(Backfill::paused);
            }
            if step == 2 {
                trigger.backfill = trigger.backfill.take().map(Backfill::resumed);
            }

            let anchor = trigger
                .active_backfill()
                .filter(|b| !b.paused)
                .map_or(trigger.date, |b| b.current_date);
            let Some(next) = schedule.next_evaluation_date(&ctx, Some(&trigger)) else {
                break;
            };
            assert!(next > anchor, "{next} <= {anchor}");
            trigger = trigger.advance(next);
        }

        assert_eq!(
            fired,
            [1, 2, 3, 5, 6, 8, 9]
                .into_iter()
                .map(|d| utc(2024, 1, d))
                .collect::<Vec<_>>()
        );
    }
}
