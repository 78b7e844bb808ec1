//! Builds the execution request for an accepted occurrence.
//!
//! Building never fails from the caller's point of view: if labels or inputs
//! cannot be produced, the result is a FAILED execution that records why.

use crate::context::{ConditionContext, Output};
use crate::error::BuildError;
use crate::schedulable::TriggerOptions;
use crate::trigger_context::TriggerContext;
use cadence_flow::{
    ExecutionRequest, ExecutionTrigger, Label, merge_labels, without_system_labels,
};
use rootcause::Report;
use serde_json::{Map, Value as JsonValue};
use tracing::error;

/// Value of the `system.from` label on scheduled executions.
pub const FROM_TRIGGER: &str = "trigger";

/// Turns an accepted occurrence into an [`ExecutionRequest`].
#[derive(Debug, Clone, Copy)]
pub struct ExecutionBuilder<'a> {
    kind: &'a str,
    options: &'a TriggerOptions,
    ctx: &'a ConditionContext,
    trigger: &'a TriggerContext,
}

impl<'a> ExecutionBuilder<'a> {
    /// Creates a builder for one evaluation of a trigger.
    #[must_use]
    pub fn new(
        kind: &'a str,
        options: &'a TriggerOptions,
        ctx: &'a ConditionContext,
        trigger: &'a TriggerContext,
    ) -> Self {
        Self {
            kind,
            options,
            ctx,
            trigger,
        }
    }

    /// Builds the execution for `output`.
    #[must_use]
    pub fn build(&self, output: &Output) -> ExecutionRequest {
        let draft = self.draft(output);
        match self.try_build(output, draft.clone()) {
            Ok(execution) => execution,
            Err(report) => {
                error!(
                    trigger = %self.trigger,
                    date = %output.date,
                    error = %report,
                    "failed to build execution"
                );
                self.failed_from(draft, report.to_string())
            }
        }
    }

    /// Builds a FAILED execution for `output`, e.g. after a condition error.
    #[must_use]
    pub fn failed(&self, output: &Output, reason: impl Into<String>) -> ExecutionRequest {
        self.failed_from(self.draft(output), reason.into())
    }

    fn draft(&self, output: &Output) -> ExecutionRequest {
        ExecutionRequest::for_flow(self.ctx.flow())
            .with_trigger(ExecutionTrigger {
                id: self.options.id.clone(),
                kind: self.kind.to_string(),
                variables: output.to_variables(),
            })
            .with_schedule_date(output.date)
    }

    fn try_build(
        &self,
        output: &Output,
        draft: ExecutionRequest,
    ) -> Result<ExecutionRequest, Report<BuildError>> {
        let ctx = self.ctx.with_output(output);
        let backfill = self.trigger.active_backfill();

        let trigger_labels = render_labels(&ctx, &self.options.labels)?;
        let backfill_labels = match backfill {
            Some(b) => without_system_labels(&render_labels(&ctx, &b.labels)?),
            None => Vec::new(),
        };
        let labels = merge_labels(
            without_system_labels(&self.ctx.flow().labels),
            trigger_labels,
        );
        let labels = merge_labels(labels, backfill_labels);
        let labels = with_system_labels(labels, &draft);

        let mut raw = render_inputs(&ctx, &self.options.inputs)?;
        if let Some(b) = backfill {
            raw.extend(render_inputs(&ctx, &b.inputs)?);
        }

        let execution = draft.with_labels(labels);
        let inputs = self
            .ctx
            .services()
            .inputs
            .resolve(self.ctx.flow(), &execution, raw)
            .map_err(|e| BuildError::Inputs {
                reason: e.to_string(),
            })?;

        Ok(execution.with_inputs(inputs))
    }

    fn failed_from(&self, draft: ExecutionRequest, reason: String) -> ExecutionRequest {
        let labels = with_system_labels(without_system_labels(&self.ctx.flow().labels), &draft);
        draft.with_labels(labels).failed(reason)
    }
}

/// Sets `system.from` and, unless one is already present, a correlation id
/// equal to the execution id.
fn with_system_labels(labels: Vec<Label>, execution: &ExecutionRequest) -> Vec<Label> {
    let mut labels = merge_labels(labels, [Label::new(Label::FROM, FROM_TRIGGER)]);
    if !labels.iter().any(|l| l.key == Label::CORRELATION_ID) {
        labels.push(Label::new(Label::CORRELATION_ID, execution.id.to_string()));
    }
    labels
}

fn render_labels(ctx: &ConditionContext, labels: &[Label]) -> Result<Vec<Label>, BuildError> {
    labels
        .iter()
        .map(|label| {
            ctx.render(&label.value)
                .map(|value| Label::new(label.key.clone(), value))
                .map_err(|e| BuildError::Labels {
                    reason: e.to_string(),
                })
        })
        .collect()
}

fn render_inputs(
    ctx: &ConditionContext,
    inputs: &Map<String, JsonValue>,
) -> Result<Map<String, JsonValue>, BuildError> {
    inputs
        .iter()
        .map(|(key, value)| {
            ctx.render_value(value)
                .map(|rendered| (key.clone(), rendered))
                .map_err(|e| BuildError::Inputs {
                    reason: e.to_string(),
                })
        })
        .collect()
}
