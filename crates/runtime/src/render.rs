//! Human-readable rendering of invocation outcomes.

use std::collections::HashMap;

use serde_json::Value;

use crate::dispatch::InvocationOutcome;

/// Formats a successful tool's value.
///
/// Returning `None` falls back to the generic rendering, which keeps
/// [`Renderer::render`] total even when a value has an unexpected shape.
pub type Formatter = fn(&Value) -> Option<String>;

/// Renders outcomes to text, optionally with per-tool formatters.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    formatters: HashMap<String, Formatter>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `formatter` for successful results of `tool`.
    pub fn with_formatter(mut self, tool: impl Into<String>, formatter: Formatter) -> Self {
        self.formatters.insert(tool.into(), formatter);
        self
    }

    pub fn render(&self, outcome: &InvocationOutcome) -> String {
        match outcome {
            InvocationOutcome::Success { tool, value } => {
                let formatted = self.formatters.get(tool).and_then(|format| format(value));
                match formatted {
                    Some(block) => format!("Function called: {tool}, Result:\n{block}"),
                    None => format!("Function called: {tool}, Result: {}", display_value(value)),
                }
            }
            InvocationOutcome::NotFound { tool } => format!("Function not found: {tool}"),
            InvocationOutcome::ArgumentError { tool, error } => {
                format!("Invalid arguments for {tool}: {error}")
            }
            InvocationOutcome::ExecutionError { tool, error } => {
                format!("Error executing {tool}: {error}")
            }
        }
    }
}

/// Render with no per-tool formatters.
pub fn render(outcome: &InvocationOutcome) -> String {
    Renderer::default().render(outcome)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}
