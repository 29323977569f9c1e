//! Toolbelt runtime: tool registry, completion backends and dispatch.
//!
//! A turn sends one user message, together with the declarations of every
//! registered tool, to a completion engine. The engine answers with text and
//! zero or more proposed invocations, which are validated and executed one at
//! a time. Each invocation yields exactly one [`InvocationOutcome`].
//!
//! # Overview
//!
//! - **Registry**: tools keyed by name, in registration order.
//! - **export**: the declarations the engine sees.
//! - **Backend**: a trait over completion engines ([`OllamaBackend`]).
//! - **Dispatcher**: the isolating per-invocation loop.
//! - **Renderer**: outcome to text.
//! - **TurnRunner**: one stateless turn from text to outcomes.
//!
//! # Example
//!
//! ```ignore
//! use runtime::{OllamaBackend, Registry, Renderer, TurnRunner};
//!
//! # async fn example(registry: Registry) -> runtime::Result<()> {
//! let backend = OllamaBackend::builder("qwen2.5-coder").build()?;
//! let runner = TurnRunner::new(backend, registry);
//!
//! let report = runner.run("What is 5 plus 3?").await?;
//! let renderer = Renderer::new();
//! for outcome in &report.outcomes {
//!     println!("{}", renderer.render(outcome));
//! }
//! # Ok(())
//! # }
//! ```

pub mod dispatch;
mod error;
pub mod model;
pub mod providers;
pub mod render;
pub mod tools;
mod turn;

pub use dispatch::{Dispatcher, InvocationOutcome, dispatch};
pub use error::{Error, Result};
pub use model::{Backend, CompletionRequest, CompletionResult, ModelError, Usage};
pub use providers::{OllamaBackend, OllamaBackendBuilder};
pub use render::{Formatter, Renderer, render};
pub use tools::{
    ArgumentError, Arguments, ParamSpec, ParamType, ProposedInvocation, RegisteredTool, Registry,
    RegistryError, Tool, ToolDeclaration, ToolError, export,
};
pub use turn::{TurnReport, TurnRunner};
