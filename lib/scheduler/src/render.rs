//! Template rendering for conditions, labels and inputs.
//!
//! Templates use Jinja syntax (`{{ trigger.date }}`, `{{ flow.namespace }}`).
//! Rendering is strict: referencing a variable that does not exist is an
//! error rather than an empty string.

use crate::error::RenderError;
use minijinja::{Environment, UndefinedBehavior};
use rootcause::Report;
use serde_json::{Map, Value as JsonValue};

/// Renders templates against a JSON variable tree.
pub trait Renderer: Send + Sync {
    /// Renders a single template string.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is malformed or references an
    /// undefined variable.
    fn render(&self, template: &str, variables: &JsonValue) -> Result<String, Report<RenderError>>;

    /// Renders every string inside `value`, keeping its shape.
    ///
    /// # Errors
    ///
    /// Returns the first rendering error encountered.
    fn render_value(
        &self,
        value: &JsonValue,
        variables: &JsonValue,
    ) -> Result<JsonValue, Report<RenderError>> {
        match value {
            JsonValue::String(template) => self.render(template, variables).map(JsonValue::String),
            JsonValue::Array(items) => items
                .iter()
                .map(|item| self.render_value(item, variables))
                .collect::<Result<Vec<_>, _>>()
                .map(JsonValue::Array),
            JsonValue::Object(entries) => entries
                .iter()
                .map(|(key, item)| Ok((key.clone(), self.render_value(item, variables)?)))
                .collect::<Result<Map<_, _>, Report<RenderError>>>()
                .map(JsonValue::Object),
            other => Ok(other.clone()),
        }
    }
}

/// [`Renderer`] backed by minijinja.
#[derive(Debug)]
pub struct MinijinjaRenderer {
    env: Environment<'static>,
}

impl MinijinjaRenderer {
    /// Creates a renderer with strict undefined handling.
    #[must_use]
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Self { env }
    }
}

impl Default for MinijinjaRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for MinijinjaRenderer {
    fn render(&self, template: &str, variables: &JsonValue) -> Result<String, Report<RenderError>> {
        // Plain strings are the common case for labels and inputs.
        if !template.contains("{{") && !template.contains("{%") {
            return Ok(template.to_string());
        }

        self.env.render_str(template, variables).map_err(|e| {
            RenderError::Template {
                template: template.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_nested_variables() {
        let renderer = MinijinjaRenderer::new();
        let vars = json!({"trigger": {"date": "2024-01-01T00:00:00Z"}});

        let out = renderer
            .render("run at {{ trigger.date }}", &vars)
            .expect("render");
        assert_eq!(out, "run at 2024-01-01T00:00:00Z");
    }

    #[test]
    fn undefined_variable_is_an_error() {
        let renderer = MinijinjaRenderer::new();
        let err = renderer
            .render("{{ missing.variable }}", &json!({}))
            .unwrap_err();
        assert!(err.to_string().contains("missing.variable"));
    }

    #[test]
    fn plain_strings_pass_through() {
        let renderer = MinijinjaRenderer::new();
        assert_eq!(renderer.render("eu-west", &json!({})).expect("render"), "eu-west");
    }

    #[test]
    fn render_value_keeps_shape() {
        let renderer = MinijinjaRenderer::new();
        let vars = json!({"flow": {"id": "etl"}});
        let value = json!({
            "name": "{{ flow.id }}",
            "count": 3,
            "tags": ["{{ flow.id }}-a", true],
        });

        let rendered = renderer.render_value(&value, &vars).expect("render");
        assert_eq!(
            rendered,
            json!({"name": "etl", "count": 3, "tags": ["etl-a", true]})
        );
    }

    #[test]
    fn render_value_reports_nested_errors() {
        let renderer = MinijinjaRenderer::new();
        let value = json!({"outer": {"inner": "{{ nope }}"}});
        assert!(renderer.render_value(&value, &json!({})).is_err());
    }
}
