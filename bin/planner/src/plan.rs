//! Dry-run simulation of the trigger driver loop.

use crate::error::PlannerError;
use cadence_core::Result;
use cadence_flow::{ExecutionRequest, Flow};
use cadence_scheduler::{
    Backfill, Clock, ConditionContext, FakeClock, Schedulable, ScheduleTrigger, Services, TriggerContext,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// A flow, one of its schedule triggers and an optional backfill.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanDefinition {
    pub flow: Flow,
    pub trigger: ScheduleTrigger,
    #[serde(default)]
    pub backfill: Option<BackfillWindow>,
}

/// A backfill request in a plan document.
#[derive(Debug, Clone, Deserialize)]
pub struct BackfillWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub inputs: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub labels: Vec<cadence_flow::Label>,
}

/// One simulated evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedRun {
    /// The date the driver evaluated the trigger at.
    pub date: DateTime<Utc>,
    /// The execution the evaluation produced, if it fired.
    pub execution: Option<ExecutionRequest>,
}

/// Reads and validates a JSON plan definition.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the trigger or
/// backfill is invalid.
pub fn load_definition(path: &Path) -> Result<PlanDefinition, PlannerError> {
    let contents = std::fs::read_to_string(path).map_err(|e| PlannerError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let definition: PlanDefinition =
        serde_json::from_str(&contents).map_err(|e| PlannerError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    definition
        .trigger
        .validate()
        .map_err(|e| PlannerError::Definition {
            reason: e.to_string(),
        })?;
    definition.backfill_state()?;

    Ok(definition)
}

impl PlanDefinition {
    fn backfill_state(&self) -> Result<Option<Backfill>, PlannerError> {
        let Some(window) = &self.backfill else {
            return Ok(None);
        };
        let backfill = Backfill::new(window.start, window.end)
            .map_err(|e| PlannerError::Definition {
                reason: e.to_string(),
            })?
            .with_inputs(window.inputs.clone())
            .with_labels(window.labels.clone());
        Ok(Some(backfill))
    }
}

/// Simulates `count` driver iterations starting at `now`.
///
/// The simulated clock jumps to each evaluation date, so every real-time
/// occurrence fires. A backfill is replayed first, with the clock held at
/// `now`.
///
/// # Errors
///
/// Returns an error if the backfill window is invalid.
pub fn simulate(
    definition: &PlanDefinition,
    services: Services,
    now: DateTime<Utc>,
    count: usize,
) -> Result<Vec<PlannedRun>, PlannerError> {
    let clock = FakeClock::at(now);
    let ctx = ConditionContext::new(
        Arc::new(definition.flow.clone()),
        services.with_clock(clock.clone()),
    );
    let trigger = &definition.trigger;

    let Some(first) = trigger.next_evaluation_date(&ctx, None) else {
        return Ok(Vec::new());
    };
    let mut state = TriggerContext::for_flow(&definition.flow, trigger.id(), first);
    if let Some(backfill) = definition.backfill_state()? {
        state = state.with_backfill(backfill);
    }

    let mut runs = Vec::with_capacity(count);
    while runs.len() < count {
        let date = state
            .active_backfill()
            .map_or(state.date, |backfill| backfill.current_date);
        if state.active_backfill().is_none() && state.date > clock.now() {
            clock.set(state.date);
        }

        let execution = trigger.evaluate(&ctx, &state);
        debug!(date = %date, fired = execution.is_some(), "simulated evaluation");
        runs.push(PlannedRun { date, execution });

        let Some(next) = trigger.next_evaluation_date(&ctx, Some(&state)) else {
            break;
        };
        state = state.advance(next);
    }

    Ok(runs)
}
