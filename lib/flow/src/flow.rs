//! Flow definition types.
//!
//! Only the parts of a flow the scheduler reads are modelled here: identity,
//! revision, labels, declared inputs and flow variables. Tasks and their
//! execution belong to the runtime.

use crate::label::Label;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use std::fmt;

/// The declared type of a flow input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    /// Free-form text.
    #[default]
    String,
    /// Signed 64-bit integer.
    Int,
    /// 64-bit float.
    Float,
    /// `true` / `false`.
    Boolean,
    /// Arbitrary JSON document.
    Json,
    /// RFC 3339 timestamp.
    Datetime,
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Json => "json",
            Self::Datetime => "datetime",
        };
        f.write_str(name)
    }
}

/// An input declared by a flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowInput {
    /// Input name.
    pub id: String,
    /// Declared type.
    #[serde(rename = "type", default)]
    pub kind: InputType,
    /// Whether a value must be present after defaults are applied.
    #[serde(default = "default_required")]
    pub required: bool,
    /// Value used when the execution does not provide one.
    #[serde(default)]
    pub default: Option<JsonValue>,
}

fn default_required() -> bool {
    true
}

impl FlowInput {
    /// Creates a required input of the given type.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: InputType) -> Self {
        Self {
            id: id.into(),
            kind,
            required: default_required(),
            default: None,
        }
    }

    /// Marks the input as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, default: JsonValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// A flow, as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    /// Owning tenant, if the platform is multi-tenant.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Namespace the flow lives in.
    pub namespace: String,
    /// Flow identifier, unique within its namespace.
    pub id: String,
    /// Revision of the definition that produced this trigger.
    #[serde(default = "default_revision")]
    pub revision: u32,
    /// Flow-level labels.
    #[serde(default)]
    pub labels: Vec<Label>,
    /// Declared inputs.
    #[serde(default)]
    pub inputs: Vec<FlowInput>,
    /// Flow variables copied onto every execution.
    #[serde(default)]
    pub variables: Map<String, JsonValue>,
}

fn default_revision() -> u32 {
    1
}

impl Flow {
    /// Creates a flow at revision 1 with no labels, inputs or variables.
    #[must_use]
    pub fn new(namespace: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            tenant_id: None,
            namespace: namespace.into(),
            id: id.into(),
            revision: default_revision(),
            labels: Vec::new(),
            inputs: Vec::new(),
            variables: Map::new(),
        }
    }

    /// Sets the tenant.
    #[must_use]
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Sets the revision.
    #[must_use]
    pub fn with_revision(mut self, revision: u32) -> Self {
        self.revision = revision;
        self
    }

    /// Adds a label.
    #[must_use]
    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    /// Declares an input.
    #[must_use]
    pub fn with_input(mut self, input: FlowInput) -> Self {
        self.inputs.push(input);
        self
    }

    /// Sets a flow variable.
    #[must_use]
    pub fn with_variable(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.variables.insert(key.into(), value);
        self
    }

    /// Returns the variables exposed to templates under `flow`.
    #[must_use]
    pub fn template_variables(&self) -> JsonValue {
        let labels: Map<String, JsonValue> = self
            .labels
            .iter()
            .map(|l| (l.key.clone(), JsonValue::String(l.value.clone())))
            .collect();

        json!({
            "id": self.id,
            "namespace": self.namespace,
            "revision": self.revision,
            "tenantId": self.tenant_id,
            "labels": labels,
        })
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tenant_id {
            Some(tenant) => write!(f, "{tenant}/{}.{}", self.namespace, self.id),
            None => write!(f, "{}.{}", self.namespace, self.id),
        }
    }
}
