//! Schedule conditions and the gate that combines them.
//!
//! A condition is a boolean predicate over a [`ConditionContext`]. The gate
//! ANDs every condition of a trigger and can search an occurrence source for
//! the first occurrence the conditions accept.

use crate::conditions::Condition;
use crate::context::{ConditionContext, Output};
use crate::error::ConditionError;
use crate::occurrence::OccurrenceSource;
use chrono::{DateTime, Datelike, Utc};
use rootcause::Report;
use std::fmt;

/// A predicate deciding whether an occurrence may fire.
pub trait ScheduleCondition: fmt::Debug + Send + Sync {
    /// Tests the occurrence exposed in `ctx` under `trigger`.
    ///
    /// # Errors
    ///
    /// Returns an error if the condition cannot be evaluated.
    fn test(&self, ctx: &ConditionContext) -> Result<bool, Report<ConditionError>>;
}

/// Search direction for [`ConditionGate::find_first_accepted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Occurrences strictly after the starting point.
    Forward,
    /// Occurrences strictly before the starting point.
    Backward,
}

/// The AND of a trigger's conditions.
#[derive(Debug, Clone, Copy)]
pub struct ConditionGate<'a> {
    conditions: &'a [Condition],
}

impl<'a> ConditionGate<'a> {
    /// Creates a gate over the given conditions.
    #[must_use]
    pub fn new(conditions: &'a [Condition]) -> Self {
        Self { conditions }
    }

    /// Returns true if there is nothing to check.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Returns true if every condition accepts. Stops at the first rejection.
    ///
    /// # Errors
    ///
    /// Returns the first condition error.
    pub fn accepts(&self, ctx: &ConditionContext) -> Result<bool, Report<ConditionError>> {
        for condition in self.conditions {
            if !condition.test(ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Walks `source` from `from` and returns the first occurrence accepted by
    /// every condition.
    ///
    /// The walk gives up once candidates leave the configured window of years
    /// around the current year. Running out of occurrences or of window is
    /// `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the first condition error; the search stops there.
    pub fn find_first_accepted(
        &self,
        direction: Direction,
        from: DateTime<Utc>,
        source: &dyn OccurrenceSource,
        ctx: &ConditionContext,
    ) -> Result<Option<DateTime<Utc>>, Report<ConditionError>> {
        let current_year = ctx.now().year();
        let window = ctx.config().search_window_years;
        let mut cursor = from;

        loop {
            let candidate = match direction {
                Direction::Forward => source.next_after(cursor),
                Direction::Backward => source.previous_before(cursor),
            };
            let Some(candidate) = candidate else {
                return Ok(None);
            };
            if (candidate.year() - current_year).abs() > window {
                return Ok(None);
            }

            let output = Output {
                date: candidate,
                next: source.next_after(candidate),
                previous: source.previous_before(candidate),
            };
            if self.accepts(&ctx.with_output(&output))? {
                return Ok(Some(candidate));
            }
            cursor = candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::config::SchedulerConfig;
    use crate::context::Services;
    use crate::occurrence::{CronOccurrences, DateOccurrences};
    use cadence_flow::Flow;
    use chrono::{TimeZone, Timelike};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn utc(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0)
            .single()
            .expect("valid date")
    }

    fn ctx_at(now: DateTime<Utc>) -> ConditionContext {
        let services = Services::new().with_clock(FakeClock::at(now));
        ConditionContext::new(Arc::new(Flow::new("ns", "f")), services)
    }

    fn trigger_date(ctx: &ConditionContext) -> DateTime<Utc> {
        let vars = ctx.variables();
        let date = vars["trigger"]["date"].as_str().expect("trigger.date");
        DateTime::parse_from_rfc3339(date)
            .expect("rfc3339")
            .with_timezone(&Utc)
    }

    /// Accepts occurrences at the given hour.
    #[derive(Debug)]
    struct AtHour(u32);

    impl ScheduleCondition for AtHour {
        fn test(&self, ctx: &ConditionContext) -> Result<bool, Report<ConditionError>> {
            Ok(trigger_date(ctx).hour() == self.0)
        }
    }

    #[derive(Debug)]
    struct Broken;

    impl ScheduleCondition for Broken {
        fn test(&self, _ctx: &ConditionContext) -> Result<bool, Report<ConditionError>> {
            Err(ConditionError::NotBoolean {
                condition: "broken".to_string(),
                value: "maybe".to_string(),
            }
            .into())
        }
    }

    #[derive(Debug, Default)]
    struct Counting(AtomicUsize);

    impl ScheduleCondition for Counting {
        fn test(&self, _ctx: &ConditionContext) -> Result<bool, Report<ConditionError>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    }

    fn custom(condition: impl ScheduleCondition + 'static) -> Condition {
        Condition::Custom(Arc::new(condition))
    }

    #[test]
    fn empty_gate_accepts() {
        let gate = ConditionGate::new(&[]);
        assert!(gate.is_empty());
        assert!(gate.accepts(&ctx_at(utc(2024, 1, 1, 0))).expect("accepts"));
    }

    #[test]
    fn rejection_short_circuits() {
        let counter = Arc::new(Counting::default());
        let conditions = vec![
            custom(AtHour(3)),
            Condition::Custom(counter.clone()),
        ];
        let gate = ConditionGate::new(&conditions);
        let ctx = ctx_at(utc(2024, 1, 1, 0)).with_output(&Output::at(utc(2024, 1, 1, 5)));

        assert!(!gate.accepts(&ctx).expect("accepts"));
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn error_is_returned() {
        let conditions = vec![custom(Broken)];
        let gate = ConditionGate::new(&conditions);
        let err = gate.accepts(&ctx_at(utc(2024, 1, 1, 0))).unwrap_err();
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn forward_search_finds_first_accepted() {
        let source = CronOccurrences::parse("0 * * * *", None).expect("parse");
        let conditions = vec![custom(AtHour(6))];
        let gate = ConditionGate::new(&conditions);
        let ctx = ctx_at(utc(2024, 1, 1, 0));

        let found = gate
            .find_first_accepted(Direction::Forward, utc(2024, 1, 1, 6), &source, &ctx)
            .expect("search");
        assert_eq!(found, Some(utc(2024, 1, 2, 6)));
    }

    #[test]
    fn backward_search_finds_last_accepted() {
        let source = CronOccurrences::parse("0 * * * *", None).expect("parse");
        let conditions = vec![custom(AtHour(6))];
        let gate = ConditionGate::new(&conditions);
        let ctx = ctx_at(utc(2024, 1, 3, 0));

        let found = gate
            .find_first_accepted(Direction::Backward, utc(2024, 1, 3, 0), &source, &ctx)
            .expect("search");
        assert_eq!(found, Some(utc(2024, 1, 2, 6)));
    }

    #[test]
    fn exhausted_source_yields_none() {
        let source = DateOccurrences::new([utc(2024, 1, 1, 5), utc(2024, 1, 1, 7)]).expect("dates");
        let conditions = vec![custom(AtHour(6))];
        let gate = ConditionGate::new(&conditions);
        let ctx = ctx_at(utc(2024, 1, 1, 0));

        let found = gate
            .find_first_accepted(Direction::Forward, utc(2024, 1, 1, 0), &source, &ctx)
            .expect("search");
        assert_eq!(found, None);
    }

    #[test]
    fn search_is_bounded_by_window() {
        let source = CronOccurrences::parse("0 0 1 1 *", None).expect("parse");
        let conditions = vec![custom(AtHour(12))];
        let gate = ConditionGate::new(&conditions);
        let services = Services::new()
            .with_clock(FakeClock::at(utc(2024, 6, 1, 0)))
            .with_config(SchedulerConfig {
                search_window_years: 2,
                ..Default::default()
            });
        let ctx = ConditionContext::new(Arc::new(Flow::new("ns", "f")), services);

        let found = gate
            .find_first_accepted(Direction::Forward, utc(2024, 6, 1, 0), &source, &ctx)
            .expect("search");
        assert_eq!(found, None);
    }

    #[test]
    fn search_stops_on_error() {
        let source = CronOccurrences::parse("0 * * * *", None).expect("parse");
        let conditions = vec![custom(Broken)];
        let gate = ConditionGate::new(&conditions);
        let ctx = ctx_at(utc(2024, 1, 1, 0));

        assert!(
            gate.find_first_accepted(Direction::Forward, utc(2024, 1, 1, 0), &source, &ctx)
                .is_err()
        );
    }
}
