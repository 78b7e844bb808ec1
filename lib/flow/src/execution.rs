//! Execution requests produced by triggers.
//!
//! An `ExecutionRequest` is created once per accepted trigger tick and handed
//! to the execution runtime. The scheduler never keeps a reference to it.

use crate::flow::Flow;
use crate::label::Label;
use cadence_core::ExecutionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// The state an execution request is created in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    /// Ready to be picked up by the runtime.
    Created,
    /// Could not be built; recorded so operators see the broken trigger.
    Failed,
}

impl ExecutionState {
    /// Returns true if this is a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Snapshot of the trigger that created an execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrigger {
    /// Trigger id within the flow.
    pub id: String,
    /// Trigger kind (e.g. `schedule`).
    pub kind: String,
    /// Variables the trigger exposed to the execution.
    pub variables: JsonValue,
}

/// A request to run a flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Unique identifier for this execution.
    pub id: ExecutionId,
    /// Owning tenant.
    pub tenant_id: Option<String>,
    /// Flow namespace.
    pub namespace: String,
    /// Flow id.
    pub flow_id: String,
    /// Flow revision the execution runs.
    pub flow_revision: u32,
    /// Execution labels.
    pub labels: Vec<Label>,
    /// Resolved inputs.
    pub inputs: Map<String, JsonValue>,
    /// Flow variables at creation time.
    pub variables: Map<String, JsonValue>,
    /// Initial state.
    pub state: ExecutionState,
    /// The trigger that created this execution, if any.
    pub trigger: Option<ExecutionTrigger>,
    /// The occurrence this execution was scheduled for.
    pub schedule_date: Option<DateTime<Utc>>,
    /// Why the request was created in the failed state.
    pub error: Option<String>,
}

impl ExecutionRequest {
    /// Creates a request for the given flow in the `Created` state.
    #[must_use]
    pub fn for_flow(flow: &Flow) -> Self {
        Self {
            id: ExecutionId::new(),
            tenant_id: flow.tenant_id.clone(),
            namespace: flow.namespace.clone(),
            flow_id: flow.id.clone(),
            flow_revision: flow.revision,
            labels: Vec::new(),
            inputs: Map::new(),
            variables: flow.variables.clone(),
            state: ExecutionState::Created,
            trigger: None,
            schedule_date: None,
            error: None,
        }
    }

    /// Sets the labels.
    #[must_use]
    pub fn with_labels(mut self, labels: Vec<Label>) -> Self {
        self.labels = labels;
        self
    }

    /// Sets the inputs.
    #[must_use]
    pub fn with_inputs(mut self, inputs: Map<String, JsonValue>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Sets the trigger snapshot.
    #[must_use]
    pub fn with_trigger(mut self, trigger: ExecutionTrigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Sets the scheduled occurrence.
    #[must_use]
    pub fn with_schedule_date(mut self, date: DateTime<Utc>) -> Self {
        self.schedule_date = Some(date);
        self
    }

    /// Turns the request into a failed one. Inputs are dropped.
    #[must_use]
    pub fn failed(mut self, reason: impl Into<String>) -> Self {
        self.state = ExecutionState::Failed;
        self.inputs = Map::new();
        self.error = Some(reason.into());
        self
    }

    /// Returns the value of the first label with the given key.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.key == key)
            .map(|l| l.value.as_str())
    }

    /// Returns the correlation id label, if set.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.label(Label::CORRELATION_ID)
    }
}
