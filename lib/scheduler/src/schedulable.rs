//! The schedulable trigger contract and the engine shared by its variants.
//!
//! A driver loop owns the persisted [`TriggerContext`] of each trigger. On
//! each tick it calls [`Schedulable::evaluate`] once the context's date is
//! reached, then stores `ctx.advance(next_evaluation_date(..))`.

use crate::backfill::Backfill;
use crate::condition::{ConditionGate, Direction};
use crate::conditions::Condition;
use crate::context::{ConditionContext, Output};
use crate::error::ScheduleError;
use crate::execution_builder::ExecutionBuilder;
use crate::occurrence::OccurrenceSource;
use crate::trigger_context::TriggerContext;
use cadence_flow::{ExecutionRequest, Label};
use chrono::{DateTime, Duration, Utc};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, error, instrument, trace, warn};

/// Options every schedule trigger carries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerOptions {
    /// Trigger id, unique within the flow.
    pub id: String,
    /// Conditions an occurrence must satisfy to fire.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Occurrences older than this when evaluated are skipped.
    #[serde(with = "humantime_serde", default)]
    pub late_maximum_delay: Option<std::time::Duration>,
    /// Inputs for created executions. Strings are templates.
    #[serde(default)]
    pub inputs: Map<String, JsonValue>,
    /// Labels for created executions. Values are templates.
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl TriggerOptions {
    /// Creates options with the given id and nothing else.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Adds a condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Sets the late maximum delay.
    #[must_use]
    pub fn with_late_maximum_delay(mut self, delay: std::time::Duration) -> Self {
        self.late_maximum_delay = Some(delay);
        self
    }

    /// Sets an input.
    #[must_use]
    pub fn with_input(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.inputs.insert(key.into(), value);
        self
    }

    /// Adds a label.
    #[must_use]
    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    /// The late maximum delay as a calendar duration.
    ///
    /// # Errors
    ///
    /// Returns an error if the delay is too large to represent.
    pub fn late_delay(&self) -> Result<Option<Duration>, Report<ScheduleError>> {
        let Some(delay) = self.late_maximum_delay else {
            return Ok(None);
        };
        let delay =
            Duration::from_std(delay).map_err(|e| ScheduleError::InvalidLateMaximumDelay {
                reason: e.to_string(),
            })?;

        // Keeps `date + delay` representable for any date from the epoch on.
        let limit = DateTime::<Utc>::MAX_UTC.signed_duration_since(DateTime::<Utc>::UNIX_EPOCH);
        if delay > limit {
            return Err(ScheduleError::InvalidLateMaximumDelay {
                reason: "longer than the representable date range".to_string(),
            }
            .into());
        }
        Ok(Some(delay))
    }
}

/// A time-driven trigger.
///
/// Every operation is a pure function of the definition, the given contexts
/// and the clock in the services. Callers serialize calls for one trigger.
pub trait Schedulable: Send + Sync {
    /// Trigger id.
    fn id(&self) -> &str;

    /// Trigger kind, recorded on executions.
    fn kind(&self) -> &'static str;

    /// Common trigger options.
    fn options(&self) -> &TriggerOptions;

    /// Checks the definition.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error.
    fn validate(&self) -> Result<(), Report<ScheduleError>>;

    /// The date the trigger should next be evaluated at.
    ///
    /// `last` is the persisted context of the previous evaluation, if any.
    /// The result is always after `last`'s date (or backfill cursor).
    fn next_evaluation_date(
        &self,
        ctx: &ConditionContext,
        last: Option<&TriggerContext>,
    ) -> Option<DateTime<Utc>>;

    /// The most recent date the trigger would have fired at.
    fn previous_evaluation_date(&self, ctx: &ConditionContext) -> Option<DateTime<Utc>>;

    /// Decides whether the trigger fires now and builds the execution.
    fn evaluate(
        &self,
        ctx: &ConditionContext,
        trigger: &TriggerContext,
    ) -> Option<ExecutionRequest>;
}

/// Scheduling logic shared by every occurrence source.
pub(crate) struct Engine<'a, S: OccurrenceSource> {
    pub(crate) kind: &'static str,
    pub(crate) options: &'a TriggerOptions,
    pub(crate) source: &'a S,
}

impl<S: OccurrenceSource> Engine<'_, S> {
    fn gate(&self) -> ConditionGate<'_> {
        ConditionGate::new(&self.options.conditions)
    }

    fn output_at(&self, date: DateTime<Utc>) -> Output {
        Output {
            date,
            next: self.source.next_after(date),
            previous: self.source.previous_before(date),
        }
    }

    /// Moves a candidate that is more than the late maximum delay in the past
    /// to the first occurrence still inside the delay.
    fn skip_late(&self, candidate: DateTime<Utc>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let delay = match self.options.late_delay() {
            Ok(Some(delay)) => delay,
            Ok(None) => return Some(candidate),
            Err(report) => {
                warn!(trigger = %self.options.id, error = %report, "ignoring late maximum delay");
                return Some(candidate);
            }
        };

        let Some(deadline) = candidate.checked_add_signed(delay) else {
            return Some(candidate);
        };
        if deadline >= now {
            return Some(candidate);
        }
        let Some(earliest) = now.checked_sub_signed(delay) else {
            return Some(candidate);
        };

        let skipped = self.source.next_at_or_after(earliest);
        debug!(
            trigger = %self.options.id,
            date = %candidate,
            next = ?skipped,
            "occurrence is later than the late maximum delay, skipping"
        );
        skipped
    }

    /// Searches for the nearest accepted occurrence, falling back to
    /// `fallback` if a condition fails.
    fn accepted_neighbour(
        &self,
        direction: Direction,
        from: DateTime<Utc>,
        fallback: Option<DateTime<Utc>>,
        ctx: &ConditionContext,
    ) -> Option<DateTime<Utc>> {
        match self
            .gate()
            .find_first_accepted(direction, from, self.source, ctx)
        {
            Ok(found) => found,
            Err(report) => {
                warn!(
                    trigger = %self.options.id,
                    from = %from,
                    error = %report,
                    "condition search failed, using unconditioned occurrence"
                );
                fallback
            }
        }
    }

    /// `candidate` if the conditions accept it, otherwise the next accepted
    /// occurrence after it. Falls back to `candidate` on error or exhaustion.
    fn accepted_at_or_after(
        &self,
        candidate: DateTime<Utc>,
        ctx: &ConditionContext,
    ) -> DateTime<Utc> {
        let gate = self.gate();
        if gate.is_empty() {
            return candidate;
        }

        match gate.accepts(&ctx.with_output(&self.output_at(candidate))) {
            Ok(true) => candidate,
            Ok(false) => self
                .accepted_neighbour(Direction::Forward, candidate, Some(candidate), ctx)
                .unwrap_or(candidate),
            Err(report) => {
                warn!(
                    trigger = %self.options.id,
                    date = %candidate,
                    error = %report,
                    "condition evaluation failed, using unconditioned occurrence"
                );
                candidate
            }
        }
    }

    #[instrument(skip(self, ctx, trigger), fields(trigger = %trigger, kind = self.kind))]
    pub(crate) fn evaluate(
        &self,
        ctx: &ConditionContext,
        trigger: &TriggerContext,
    ) -> Option<ExecutionRequest> {
        let now = ctx.now();
        let backfill = trigger.active_backfill();
        let driving = backfill.map_or(trigger.date, |b| b.current_date);

        let Some(mut date) = self.source.next_at_or_after(driving) else {
            debug!(date = %driving, "no occurrence left");
            return None;
        };

        match backfill {
            None => date = self.skip_late(date, now)?,
            Some(b) if b.paused => {
                debug!(cursor = %b.current_date, "backfill is paused");
                return None;
            }
            Some(b) if driving < date => {
                debug!(cursor = %b.current_date, date = %date, "backfill cursor is not on an occurrence");
                return None;
            }
            Some(_) => {}
        }

        if date > now + ctx.config().future_tolerance() {
            trace!(date = %date, now = %now, "occurrence is in the future");
            return None;
        }

        let builder = ExecutionBuilder::new(self.kind, self.options, ctx, trigger);
        let mut output = self.output_at(date);

        let gate = self.gate();
        if !gate.is_empty() {
            match gate.accepts(&ctx.with_output(&output)) {
                Ok(true) => {
                    output.next =
                        self.accepted_neighbour(Direction::Forward, date, output.next, ctx);
                    output.previous =
                        self.accepted_neighbour(Direction::Backward, date, output.previous, ctx);
                }
                Ok(false) => {
                    debug!(date = %date, "conditions rejected occurrence");
                    return None;
                }
                Err(report) => {
                    error!(date = %date, error = %report, "condition evaluation failed");
                    return Some(builder.failed(&output, report.to_string()));
                }
            }
        }

        Some(builder.build(&output))
    }

    #[instrument(skip(self, ctx, last), fields(trigger = %self.options.id, kind = self.kind))]
    pub(crate) fn next_evaluation_date(
        &self,
        ctx: &ConditionContext,
        last: Option<&TriggerContext>,
    ) -> Option<DateTime<Utc>> {
        let now = ctx.now();
        let Some(last) = last else {
            let first = self.source.next(now)?;
            return Some(self.accepted_at_or_after(first, ctx));
        };

        if let Some(backfill) = last.active_backfill() {
            return self.next_backfill_date(last, backfill, ctx);
        }

        let anchor = last.date;
        let next = if self.gate().is_empty() {
            self.source.next_after(anchor)
        } else {
            let fallback = self.source.next_after(anchor);
            self.accepted_neighbour(Direction::Forward, anchor, fallback, ctx)
                .or(fallback)
        };

        next.and_then(|date| self.skip_late(date, now))
            .filter(|date| *date > anchor)
    }

    fn next_backfill_date(
        &self,
        last: &TriggerContext,
        backfill: &Backfill,
        ctx: &ConditionContext,
    ) -> Option<DateTime<Utc>> {
        let now = ctx.now();
        if backfill.paused {
            // The cursor stays put while the trigger keeps real-time dates.
            return self.source.next_after(last.date.max(now));
        }

        let anchor = backfill.current_date;
        backfill
            .advance(self.source, self.gate(), ctx)
            .filter(|date| *date > anchor)
            .or_else(|| self.source.next_after(anchor.max(now)))
    }

    pub(crate) fn previous_evaluation_date(&self, ctx: &ConditionContext) -> Option<DateTime<Utc>> {
        let now = ctx.now();
        let previous = self.source.previous(now);
        if self.gate().is_empty() {
            return previous;
        }
        self.accepted_neighbour(Direction::Backward, now, previous, ctx)
    }
}
