use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ParamType;

/// Errors raised while building a registry.
///
/// These are configuration errors: a registry that fails to build cannot be
/// used safely, so callers treat them as fatal at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("duplicate tool name: {0}")]
    DuplicateName(String),
    #[error("tool {0} has no description")]
    MissingDescription(String),
    #[error("invalid tool name: {0:?}")]
    InvalidName(String),
    #[error("tool {tool} declares parameter {parameter} more than once")]
    DuplicateParameter { tool: String, parameter: String },
}

/// Why a proposed argument mapping was rejected before execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ArgumentError {
    #[error("arguments must be an object, got {found}")]
    NotAnObject { found: String },
    #[error("missing required parameter '{name}'")]
    Missing { name: String },
    #[error("unexpected parameter '{name}'")]
    Unexpected { name: String },
    #[error("parameter '{name}' expects {expected}, got {found}")]
    TypeMismatch {
        name: String,
        expected: ParamType,
        found: String,
    },
}

/// Errors that can occur during tool execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ToolError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0}")]
    Execution(String),
    #[error("timed out after {0}ms")]
    Timeout(u64),
    #[error("panicked: {0}")]
    Panicked(String),
}

impl ToolError {
    /// Create an execution failure from anything displayable.
    pub fn execution(detail: impl std::fmt::Display) -> Self {
        Self::Execution(detail.to_string())
    }
}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        Self::Execution(err.to_string())
    }
}
