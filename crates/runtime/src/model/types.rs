use super::errors::ModelError;
use crate::tools::{ProposedInvocation, ToolDeclaration};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// One single-turn completion request.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub user_text: &'a str,
    pub tools: &'a [ToolDeclaration],
}

/// What the engine answered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionResult {
    /// Assistant text, possibly empty.
    pub text: String,
    /// Proposed calls in the order the engine listed them.
    pub invocations: Vec<ProposedInvocation>,
    pub usage: Usage,
}

/// Trait for completion engine backends.
///
/// Implementations make exactly one call per request and never retry.
pub trait Backend: Send + Sync {
    fn complete(
        &self,
        request: CompletionRequest<'_>,
    ) -> impl Future<Output = Result<CompletionResult, ModelError>> + Send;
}
