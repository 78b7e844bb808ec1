//! Evaluation context shared by conditions, backfills and execution building.

use crate::clock::{Clock, SystemClock};
use crate::config::SchedulerConfig;
use crate::error::RenderError;
use crate::render::{MinijinjaRenderer, Renderer};
use cadence_flow::{DefaultInputResolver, Flow, InputResolver};
use chrono::{DateTime, SecondsFormat, Utc};
use rootcause::Report;
use serde_json::{Map, Value as JsonValue, json};
use std::fmt;
use std::sync::Arc;

/// Collaborators the engine calls out to.
#[derive(Clone)]
pub struct Services {
    /// Source of "now".
    pub clock: Arc<dyn Clock>,
    /// Template renderer.
    pub renderer: Arc<dyn Renderer>,
    /// Execution input resolver.
    pub inputs: Arc<dyn InputResolver>,
    /// Engine limits.
    pub config: SchedulerConfig,
}

impl Services {
    /// Services backed by the system clock and the default renderer and
    /// resolver.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            renderer: Arc::new(MinijinjaRenderer::new()),
            inputs: Arc::new(DefaultInputResolver),
            config: SchedulerConfig::default(),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replaces the renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    /// Replaces the input resolver.
    #[must_use]
    pub fn with_input_resolver(mut self, inputs: impl InputResolver + 'static) -> Self {
        self.inputs = Arc::new(inputs);
        self
    }

    /// Replaces the engine limits.
    #[must_use]
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("now", &self.clock.now())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// The occurrence a trigger is considering, with its neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Output {
    /// The occurrence itself.
    pub date: DateTime<Utc>,
    /// The following occurrence, if any.
    pub next: Option<DateTime<Utc>>,
    /// The preceding occurrence, if any.
    pub previous: Option<DateTime<Utc>>,
}

impl Output {
    /// An output with no neighbours.
    #[must_use]
    pub fn at(date: DateTime<Utc>) -> Self {
        Self {
            date,
            next: None,
            previous: None,
        }
    }

    /// Variables exposed to templates under `trigger`.
    #[must_use]
    pub fn to_variables(&self) -> JsonValue {
        json!({
            "date": format_date(self.date),
            "next": self.next.map(format_date),
            "previous": self.previous.map(format_date),
        })
    }
}

fn format_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Everything a condition or template sees while a trigger is evaluated.
///
/// Contexts are never mutated; [`ConditionContext::with_output`] returns an
/// extended copy.
#[derive(Debug, Clone)]
pub struct ConditionContext {
    flow: Arc<Flow>,
    variables: Map<String, JsonValue>,
    services: Services,
}

impl ConditionContext {
    /// Creates a context for the given flow.
    #[must_use]
    pub fn new(flow: Arc<Flow>, services: Services) -> Self {
        let mut variables = Map::new();
        variables.insert("flow".to_string(), flow.template_variables());
        Self {
            flow,
            variables,
            services,
        }
    }

    /// Returns a copy exposing `output` under `trigger`.
    #[must_use]
    pub fn with_output(&self, output: &Output) -> Self {
        let mut ctx = self.clone();
        ctx.variables
            .insert("trigger".to_string(), output.to_variables());
        ctx
    }

    /// The flow being scheduled.
    #[must_use]
    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    /// The engine collaborators.
    #[must_use]
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Engine limits.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.services.config
    }

    /// Current time according to the services' clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.services.clock.now()
    }

    /// Template variables as a JSON object.
    #[must_use]
    pub fn variables(&self) -> JsonValue {
        JsonValue::Object(self.variables.clone())
    }

    /// Renders a template against this context.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render(&self, template: &str) -> Result<String, Report<RenderError>> {
        self.services.renderer.render(template, &self.variables())
    }

    /// Renders every string inside `value` against this context.
    ///
    /// # Errors
    ///
    /// Returns the first rendering error.
    pub fn render_value(&self, value: &JsonValue) -> Result<JsonValue, Report<RenderError>> {
        self.services
            .renderer
            .render_value(value, &self.variables())
    }
}
