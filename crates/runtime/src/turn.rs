//! Turn processing.

use crate::dispatch::{Dispatcher, InvocationOutcome};
use crate::model::{Backend, CompletionRequest, ModelError, Usage};
use crate::tools::{Registry, ToolDeclaration, export};
use serde::Serialize;
use tracing::info;

/// Everything one turn produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TurnReport {
    /// Assistant text, possibly empty.
    pub text: String,
    /// One outcome per proposed invocation, in engine order.
    pub outcomes: Vec<InvocationOutcome>,
    pub usage: Usage,
}

/// Runs single, independent turns against a backend and a registry.
///
/// The runner owns the registry, so it cannot be mutated once turns start.
/// No state carries over from one turn to the next.
pub struct TurnRunner<B> {
    backend: B,
    registry: Registry,
    declarations: Vec<ToolDeclaration>,
    dispatcher: Dispatcher,
}

impl<B: Backend> TurnRunner<B> {
    pub fn new(backend: B, registry: Registry) -> Self {
        let declarations = export(&registry);
        Self {
            backend,
            registry,
            declarations,
            dispatcher: Dispatcher::default(),
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Declarations sent with every request.
    pub fn declarations(&self) -> &[ToolDeclaration] {
        &self.declarations
    }

    /// Complete `user_text`, then dispatch whatever the engine proposed.
    ///
    /// Engine errors abort the turn; invocation errors are outcomes.
    pub async fn run(&self, user_text: &str) -> Result<TurnReport, ModelError> {
        let completion = self
            .backend
            .complete(CompletionRequest {
                user_text,
                tools: &self.declarations,
            })
            .await?;

        info!(
            invocations = completion.invocations.len(),
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            "completion received"
        );

        let outcomes = self
            .dispatcher
            .dispatch(&self.registry, completion.invocations)
            .await;

        Ok(TurnReport {
            text: completion.text,
            outcomes,
            usage: completion.usage,
        })
    }
}
