//! Execution input resolution.
//!
//! Triggers provide raw input values; the flow decides which of them are
//! accepted, which defaults apply and what type each value must have.

use crate::error::InputError;
use crate::execution::ExecutionRequest;
use crate::flow::{Flow, FlowInput, InputType};
use chrono::{DateTime, SecondsFormat};
use rootcause::Report;
use serde_json::{Map, Value as JsonValue};

/// Resolves raw input values against a flow's declared inputs.
pub trait InputResolver: Send + Sync {
    /// Returns the inputs the execution should run with.
    ///
    /// # Errors
    ///
    /// Returns an error if a required input is missing or a value does not
    /// match its declared type.
    fn resolve(
        &self,
        flow: &Flow,
        execution: &ExecutionRequest,
        raw: Map<String, JsonValue>,
    ) -> Result<Map<String, JsonValue>, Report<InputError>>;
}

/// Applies defaults, required checks and type coercion.
///
/// Values for inputs the flow does not declare are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultInputResolver;

impl InputResolver for DefaultInputResolver {
    fn resolve(
        &self,
        flow: &Flow,
        _execution: &ExecutionRequest,
        mut raw: Map<String, JsonValue>,
    ) -> Result<Map<String, JsonValue>, Report<InputError>> {
        let mut resolved = Map::new();

        for input in &flow.inputs {
            let value = raw
                .remove(&input.id)
                .filter(|v| !v.is_null())
                .or_else(|| input.default.clone());

            match value {
                Some(value) => {
                    resolved.insert(input.id.clone(), coerce(input, value)?);
                }
                None if input.required => {
                    return Err(InputError::MissingRequired {
                        input: input.id.clone(),
                    }
                    .into());
                }
                None => {}
            }
        }

        Ok(resolved)
    }
}

fn coerce(input: &FlowInput, value: JsonValue) -> Result<JsonValue, InputError> {
    let invalid = |reason: String| InputError::InvalidType {
        input: input.id.clone(),
        expected: input.kind,
        reason,
    };

    match (input.kind, value) {
        (InputType::String, JsonValue::String(s)) => Ok(JsonValue::String(s)),
        (InputType::String, v @ (JsonValue::Number(_) | JsonValue::Bool(_))) => {
            Ok(JsonValue::String(v.to_string()))
        }
        (InputType::Int, JsonValue::Number(n)) if n.is_i64() => Ok(JsonValue::Number(n)),
        (InputType::Int, JsonValue::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(JsonValue::from)
            .map_err(|e| invalid(e.to_string())),
        (InputType::Float, JsonValue::Number(n)) => Ok(JsonValue::Number(n)),
        (InputType::Float, JsonValue::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| invalid(e.to_string()))
            .and_then(|f| {
                serde_json::Number::from_f64(f)
                    .map(JsonValue::Number)
                    .ok_or_else(|| invalid("not a finite number".to_string()))
            }),
        (InputType::Boolean, JsonValue::Bool(b)) => Ok(JsonValue::Bool(b)),
        (InputType::Boolean, JsonValue::String(s)) => match s.trim() {
            "true" => Ok(JsonValue::Bool(true)),
            "false" => Ok(JsonValue::Bool(false)),
            other => Err(invalid(format!("'{other}' is not true or false"))),
        },
        (InputType::Json, JsonValue::String(s)) => {
            serde_json::from_str(&s).map_err(|e| invalid(e.to_string()))
        }
        (InputType::Json, v) => Ok(v),
        (InputType::Datetime, JsonValue::String(s)) => DateTime::parse_from_rfc3339(s.trim())
            .map(|d| JsonValue::String(d.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
            .map_err(|e| invalid(e.to_string())),
        (_, other) => Err(invalid(format!("unexpected value {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolve(flow: &Flow, raw: JsonValue) -> Result<Map<String, JsonValue>, Report<InputError>> {
        let execution = ExecutionRequest::for_flow(flow);
        let raw = raw.as_object().cloned().unwrap_or_default();
        DefaultInputResolver.resolve(flow, &execution, raw)
    }

    #[test]
    fn applies_defaults() {
        let flow = Flow::new("ns", "f")
            .with_input(FlowInput::new("region", InputType::String).with_default(json!("eu")));

        let inputs = resolve(&flow, json!({})).expect("resolve");
        assert_eq!(inputs["region"], "eu");
    }

    #[test]
    fn provided_value_wins_over_default() {
        let flow = Flow::new("ns", "f")
            .with_input(FlowInput::new("region", InputType::String).with_default(json!("eu")));

        let inputs = resolve(&flow, json!({"region": "us"})).expect("resolve");
        assert_eq!(inputs["region"], "us");
    }

    #[test]
    fn missing_required_input_fails() {
        let flow = Flow::new("ns", "f").with_input(FlowInput::new("region", InputType::String));

        let err = resolve(&flow, json!({})).unwrap_err();
        assert!(err.to_string().contains("missing required input 'region'"));
    }

    #[test]
    fn optional_input_may_be_absent() {
        let flow = Flow::new("ns", "f")
            .with_input(FlowInput::new("region", InputType::String).optional());

        let inputs = resolve(&flow, json!({})).expect("resolve");
        assert!(inputs.is_empty());
    }

    #[test]
    fn undeclared_values_are_dropped() {
        let flow = Flow::new("ns", "f");
        let inputs = resolve(&flow, json!({"stray": 1})).expect("resolve");
        assert!(inputs.is_empty());
    }

    #[test]
    fn rendered_strings_are_coerced() {
        let flow = Flow::new("ns", "f")
            .with_input(FlowInput::new("count", InputType::Int))
            .with_input(FlowInput::new("ratio", InputType::Float))
            .with_input(FlowInput::new("dry_run", InputType::Boolean))
            .with_input(FlowInput::new("payload", InputType::Json))
            .with_input(FlowInput::new("at", InputType::Datetime));

        let inputs = resolve(
            &flow,
            json!({
                "count": "42",
                "ratio": "0.5",
                "dry_run": "true",
                "payload": "{\"a\": [1, 2]}",
                "at": "2024-03-01T01:00:00+01:00",
            }),
        )
        .expect("resolve");

        assert_eq!(inputs["count"], 42);
        assert_eq!(inputs["ratio"], 0.5);
        assert_eq!(inputs["dry_run"], true);
        assert_eq!(inputs["payload"], json!({"a": [1, 2]}));
        assert_eq!(inputs["at"], "2024-03-01T01:00:00+01:00");
    }

    #[test]
    fn invalid_int_is_rejected() {
        let flow = Flow::new("ns", "f").with_input(FlowInput::new("count", InputType::Int));

        let err = resolve(&flow, json!({"count": "many"})).unwrap_err();
        assert!(err.to_string().contains("not a valid int"));
    }
}
