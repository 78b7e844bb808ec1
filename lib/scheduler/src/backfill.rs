//! Historical replay of a schedule over a past window.
//!
//! A backfill walks the trigger's occurrences from `start` to `end`, one
//! evaluation at a time, using `current_date` as its cursor. Once the cursor
//! passes `end` the trigger returns to real-time scheduling.

use crate::condition::{ConditionGate, Direction};
use crate::context::ConditionContext;
use crate::error::BackfillError;
use crate::occurrence::OccurrenceSource;
use cadence_flow::Label;
use chrono::{DateTime, Utc};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::warn;

/// A replay window attached to a trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backfill {
    /// First instant of the window.
    pub start: DateTime<Utc>,
    /// Last instant of the window.
    pub end: DateTime<Utc>,
    /// Cursor: the next occurrence to replay is at or after this instant.
    pub current_date: DateTime<Utc>,
    /// The trigger's real-time date when the backfill was attached.
    #[serde(default)]
    pub previous_next_execution_date: Option<DateTime<Utc>>,
    /// Suppresses firing without moving the cursor.
    #[serde(default)]
    pub paused: bool,
    /// Inputs overriding the trigger's inputs.
    #[serde(default)]
    pub inputs: Map<String, JsonValue>,
    /// Extra labels for replayed executions.
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl Backfill {
    /// Creates a backfill over `[start, end]` with the cursor at `start`.
    ///
    /// # Errors
    ///
    /// Returns an error if `end` is before `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, Report<BackfillError>> {
        if start > end {
            return Err(BackfillError::InvalidWindow { start, end }.into());
        }

        Ok(Self {
            start,
            end,
            current_date: start,
            previous_next_execution_date: None,
            paused: false,
            inputs: Map::new(),
            labels: Vec::new(),
        })
    }

    /// Sets the input overrides.
    #[must_use]
    pub fn with_inputs(mut self, inputs: Map<String, JsonValue>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Sets the extra labels.
    #[must_use]
    pub fn with_labels(mut self, labels: Vec<Label>) -> Self {
        self.labels = labels;
        self
    }

    /// Returns a paused copy.
    #[must_use]
    pub fn paused(mut self) -> Self {
        self.paused = true;
        self
    }

    /// Returns a running copy.
    #[must_use]
    pub fn resumed(mut self) -> Self {
        self.paused = false;
        self
    }

    /// Returns true while the cursor is inside the window.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.current_date <= self.end
    }

    /// Moves the cursor to `next`, or returns `None` if that completes the
    /// backfill. A paused backfill is returned unchanged.
    #[must_use]
    pub fn advanced_to(&self, next: DateTime<Utc>) -> Option<Self> {
        if self.paused {
            return Some(self.clone());
        }
        if next > self.end {
            return None;
        }

        let mut advanced = self.clone();
        advanced.current_date = next;
        Some(advanced)
    }

    /// Computes the trigger's next evaluation date while this backfill runs.
    ///
    /// The search is anchored at the cursor, not at the current time. When
    /// the next occurrence falls after `end`, scheduling resumes from now.
    pub fn advance(
        &self,
        source: &dyn OccurrenceSource,
        gate: ConditionGate<'_>,
        ctx: &ConditionContext,
    ) -> Option<DateTime<Utc>> {
        let anchor = self.current_date;
        let candidate = if gate.is_empty() {
            source.next_after(anchor)
        } else {
            match gate.find_first_accepted(Direction::Forward, anchor, source, ctx) {
                Ok(Some(date)) => Some(date),
                Ok(None) => source.next_after(anchor),
                Err(error) => {
                    warn!(
                        anchor = %anchor,
                        error = %error,
                        "backfill condition search failed, using unconditioned occurrence"
                    );
                    source.next_after(anchor)
                }
            }
        };

        match candidate {
            Some(date) if date <= self.end => Some(date),
            _ => source.next_after(ctx.now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::conditions::Condition;
    use crate::context::Services;
    use crate::occurrence::CronOccurrences;
    use cadence_flow::Flow;
    use chrono::{TimeZone, Weekday};
    use std::sync::Arc;

    fn utc(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0)
            .single()
            .expect("valid date")
    }

    fn ctx_at(now: DateTime<Utc>) -> ConditionContext {
        let services = Services::new().with_clock(FakeClock::at(now));
        ConditionContext::new(Arc::new(Flow::new("ns", "f")), services)
    }

    #[test]
    fn rejects_inverted_window() {
        let err = Backfill::new(utc(2024, 1, 3, 0), utc(2024, 1, 1, 0)).unwrap_err();
        assert!(err.to_string().contains("before its start"));
    }

    #[test]
    fn starts_at_start() {
        let backfill = Backfill::new(utc(2024, 1, 1, 0), utc(2024, 1, 3, 0)).expect("backfill");
        assert_eq!(backfill.current_date, utc(2024, 1, 1, 0));
        assert!(backfill.is_active());
        assert!(!backfill.paused);
    }

    #[test]
    fn pause_and_resume_are_pure() {
        let backfill = Backfill::new(utc(2024, 1, 1, 0), utc(2024, 1, 3, 0)).expect("backfill");
        let paused = backfill.clone().paused();

        assert!(paused.paused);
        assert!(!backfill.paused);
        assert!(!paused.resumed().paused);
    }

    #[test]
    fn advanced_to_moves_cursor_until_end() {
        let backfill = Backfill::new(utc(2024, 1, 1, 0), utc(2024, 1, 3, 0)).expect("backfill");

        let moved = backfill.advanced_to(utc(2024, 1, 2, 0)).expect("still active");
        assert_eq!(moved.current_date, utc(2024, 1, 2, 0));
        assert!(backfill.advanced_to(utc(2024, 1, 4, 0)).is_none());
    }

    #[test]
    fn paused_backfill_does_not_move() {
        let backfill = Backfill::new(utc(2024, 1, 1, 0), utc(2024, 1, 3, 0))
            .expect("backfill")
            .paused();
        let moved = backfill.advanced_to(utc(2024, 1, 2, 0)).expect("kept");
        assert_eq!(moved.current_date, utc(2024, 1, 1, 0));
    }

    #[test]
    fn advance_is_anchored_at_cursor() {
        let source = CronOccurrences::parse("0 0 * * *", None).expect("parse");
        let backfill = Backfill::new(utc(2024, 1, 1, 0), utc(2024, 1, 3, 0)).expect("backfill");
        let ctx = ctx_at(utc(2024, 6, 1, 12));

        let next = backfill.advance(&source, ConditionGate::new(&[]), &ctx);
        assert_eq!(next, Some(utc(2024, 1, 2, 0)));
    }

    #[test]
    fn advance_past_end_resumes_from_now() {
        let source = CronOccurrences::parse("0 0 * * *", None).expect("parse");
        let mut backfill = Backfill::new(utc(2024, 1, 1, 0), utc(2024, 1, 3, 0)).expect("backfill");
        backfill.current_date = utc(2024, 1, 3, 0);
        let ctx = ctx_at(utc(2024, 6, 1, 12));

        let next = backfill.advance(&source, ConditionGate::new(&[]), &ctx);
        assert_eq!(next, Some(utc(2024, 6, 2, 0)));
    }

    #[test]
    fn advance_honours_conditions() {
        let source = CronOccurrences::parse("0 0 * * *", None).expect("parse");
        // 2024-01-01 is a Monday; the next Friday is the 5th.
        let backfill = Backfill::new(utc(2024, 1, 1, 0), utc(2024, 1, 31, 0)).expect("backfill");
        let conditions = vec![Condition::day_of_week(Weekday::Fri)];
        let ctx = ctx_at(utc(2024, 6, 1, 12));

        let next = backfill.advance(&source, ConditionGate::new(&conditions), &ctx);
        assert_eq!(next, Some(utc(2024, 1, 5, 0)));
    }

    #[test]
    fn advance_falls_back_when_condition_fails() {
        let source = CronOccurrences::parse("0 0 * * *", None).expect("parse");
        let backfill = Backfill::new(utc(2024, 1, 1, 0), utc(2024, 1, 31, 0)).expect("backfill");
        let conditions = vec![Condition::expression("{{ missing.variable }}")];
        let ctx = ctx_at(utc(2024, 6, 1, 12));

        let next = backfill.advance(&source, ConditionGate::new(&conditions), &ctx);
        assert_eq!(next, Some(utc(2024, 1, 2, 0)));
    }
}
