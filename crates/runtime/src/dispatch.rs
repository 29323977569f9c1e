//! Invocation dispatch.
//!
//! A dispatch pass resolves, validates and executes each proposed invocation
//! in order. Every failure is converted into an [`InvocationOutcome`]; nothing
//! escapes the pass, so one bad invocation never affects the ones after it.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{Instrument, debug, info_span, warn};

use crate::tools::{ArgumentError, Arguments, ProposedInvocation, Registry, Tool, ToolError};

/// Result of attempting one proposed invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvocationOutcome {
    Success { tool: String, value: Value },
    NotFound { tool: String },
    ArgumentError { tool: String, error: ArgumentError },
    ExecutionError { tool: String, error: ToolError },
}

impl InvocationOutcome {
    /// Name of the tool the invocation asked for.
    pub fn tool(&self) -> &str {
        match self {
            Self::Success { tool, .. }
            | Self::NotFound { tool }
            | Self::ArgumentError { tool, .. }
            | Self::ExecutionError { tool, .. } => tool,
        }
    }

    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::NotFound { .. } => "not_found",
            Self::ArgumentError { .. } => "argument_error",
            Self::ExecutionError { .. } => "execution_error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The returned value, if the invocation succeeded.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Success { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Executes proposed invocations against a registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dispatcher {
    timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit each invocation to `timeout`.
    ///
    /// A timed-out callable is abandoned, not cancelled: it keeps running on
    /// its blocking thread and its result is discarded.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run a dispatch pass: one outcome per invocation, same order.
    pub async fn dispatch(
        &self,
        registry: &Registry,
        proposed: Vec<ProposedInvocation>,
    ) -> Vec<InvocationOutcome> {
        let mut outcomes = Vec::with_capacity(proposed.len());
        for (index, invocation) in proposed.into_iter().enumerate() {
            let span = info_span!("invocation", index, tool = invocation.name.as_str());
            outcomes.push(self.invoke(registry, invocation).instrument(span).await);
        }
        outcomes
    }

    /// Resolve, validate and execute a single invocation.
    pub async fn invoke(
        &self,
        registry: &Registry,
        invocation: ProposedInvocation,
    ) -> InvocationOutcome {
        let ProposedInvocation { name, arguments } = invocation;

        let Some(entry) = registry.lookup(&name) else {
            warn!(tool = name.as_str(), "tool not found");
            return InvocationOutcome::NotFound { tool: name };
        };

        let args = match Arguments::validate(&entry.declaration().parameters, &arguments) {
            Ok(args) => args,
            Err(error) => {
                warn!(tool = name.as_str(), %error, "invalid arguments");
                return InvocationOutcome::ArgumentError { tool: name, error };
            }
        };

        debug!(tool = name.as_str(), "executing tool");
        match self.execute(entry.tool(), args).await {
            Ok(value) => InvocationOutcome::Success { tool: name, value },
            Err(error) => {
                warn!(tool = name.as_str(), %error, "tool execution failed");
                InvocationOutcome::ExecutionError { tool: name, error }
            }
        }
    }

    async fn execute(&self, tool: Arc<dyn Tool>, args: Arguments) -> Result<Value, ToolError> {
        let task = tokio::task::spawn_blocking(move || tool.call(args));

        let joined = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| ToolError::Timeout(limit.as_millis() as u64))?,
            None => task.await,
        };

        match joined {
            Ok(result) => result,
            Err(err) if err.is_panic() => {
                Err(ToolError::Panicked(panic_message(err.into_panic())))
            }
            Err(err) => Err(ToolError::Execution(format!("tool task failed: {err}"))),
        }
    }
}

/// Dispatch with default options (no timeout).
pub async fn dispatch(
    registry: &Registry,
    proposed: Vec<ProposedInvocation>,
) -> Vec<InvocationOutcome> {
    Dispatcher::default().dispatch(registry, proposed).await
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "unknown panic".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ParamType, ToolDeclaration};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Operands {
        a: i64,
        b: i64,
    }

    struct Add;

    impl Tool for Add {
        fn declaration(&self) -> ToolDeclaration {
            ToolDeclaration::new("add", "Adds two numbers together.")
                .param("a", ParamType::Integer, "The first number.")
                .param("b", ParamType::Integer, "The second number.")
        }

        fn call(&self, args: Arguments) -> Result<Value, ToolError> {
            let Operands { a, b } = args.parse()?;
            Ok(json!(a + b))
        }
    }

    struct Divide;

    impl Tool for Divide {
        fn declaration(&self) -> ToolDeclaration {
            ToolDeclaration::new("divide", "Divides two numbers.")
                .param("a", ParamType::Integer, "Dividend.")
                .param("b", ParamType::Integer, "Divisor.")
        }

        fn call(&self, args: Arguments) -> Result<Value, ToolError> {
            let Operands { a, b } = args.parse()?;
            if b == 0 {
                return Err(ToolError::execution("division by zero"));
            }
            Ok(json!(a / b))
        }
    }

    struct Explode;

    impl Tool for Explode {
        fn declaration(&self) -> ToolDeclaration {
            ToolDeclaration::new("explode", "Always panics.")
        }

        fn call(&self, _args: Arguments) -> Result<Value, ToolError> {
            panic!("boom");
        }
    }

    struct Sleepy;

    impl Tool for Sleepy {
        fn declaration(&self) -> ToolDeclaration {
            ToolDeclaration::new("sleepy", "Takes its time.")
        }

        fn call(&self, _args: Arguments) -> Result<Value, ToolError> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(json!("done"))
        }
    }

    /// Declares an integer but reads a string.
    struct Mismatched;

    impl Tool for Mismatched {
        fn declaration(&self) -> ToolDeclaration {
            ToolDeclaration::new("mismatched", "Record disagrees with declaration.")
                .param("a", ParamType::Integer, "a")
        }

        fn call(&self, args: Arguments) -> Result<Value, ToolError> {
            #[derive(Deserialize)]
            #[allow(dead_code)]
            struct Wrong {
                a: String,
            }
            let _: Wrong = args.parse()?;
            Ok(Value::Null)
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register(Add).unwrap();
        registry.register(Divide).unwrap();
        registry.register(Explode).unwrap();
        registry.register(Sleepy).unwrap();
        registry.register(Mismatched).unwrap();
        registry
    }

    fn call(name: &str, arguments: Value) -> ProposedInvocation {
        ProposedInvocation::new(name, arguments)
    }

    #[tokio::test]
    async fn add_five_and_three() {
        let outcomes = dispatch(&registry(), vec![call("add", json!({"a": 5, "b": 3}))]).await;
        assert_eq!(
            outcomes,
            vec![InvocationOutcome::Success {
                tool: "add".into(),
                value: json!(8)
            }]
        );
    }

    #[tokio::test]
    async fn divide_by_zero_is_an_execution_error() {
        let outcomes = dispatch(
            &registry(),
            vec![
                call("divide", json!({"a": 15, "b": 3})),
                call("divide", json!({"a": 15, "b": 0})),
            ],
        )
        .await;

        assert_eq!(outcomes[0].value(), Some(&json!(5)));
        assert_eq!(
            outcomes[1],
            InvocationOutcome::ExecutionError {
                tool: "divide".into(),
                error: ToolError::Execution("division by zero".into())
            }
        );
    }

    #[tokio::test]
    async fn preserves_cardinality_and_order() {
        let proposed = vec![
            call("missing", json!({})),
            call("add", json!({"a": 1, "b": 1})),
            call("add", json!({"a": 1})),
            call("divide", json!({"a": 1, "b": 0})),
            call("add", json!({"a": 2, "b": 2})),
        ];
        let outcomes = dispatch(&registry(), proposed).await;

        let kinds: Vec<_> = outcomes.iter().map(InvocationOutcome::kind).collect();
        assert_eq!(
            kinds,
            [
                "not_found",
                "success",
                "argument_error",
                "execution_error",
                "success"
            ]
        );
        assert_eq!(outcomes[4].value(), Some(&json!(4)));
    }

    #[tokio::test]
    async fn empty_pass_yields_no_outcomes() {
        assert!(dispatch(&registry(), Vec::new()).await.is_empty());
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_not_raised() {
        let outcomes = dispatch(
            &registry(),
            vec![
                call("subtract", json!({"a": 1, "b": 1})),
                call("add", json!({"a": 2, "b": 3})),
            ],
        )
        .await;
        assert_eq!(
            outcomes[0],
            InvocationOutcome::NotFound {
                tool: "subtract".into()
            }
        );
        assert_eq!(outcomes[1].value(), Some(&json!(5)));
    }

    #[tokio::test]
    async fn missing_parameter_is_named() {
        let outcomes = dispatch(&registry(), vec![call("add", json!({"a": 5}))]).await;
        let InvocationOutcome::ArgumentError { tool, error } = &outcomes[0] else {
            panic!("expected argument error, got {:?}", outcomes[0]);
        };
        assert_eq!(tool, "add");
        assert!(error.to_string().contains("'b'"));
    }

    #[tokio::test]
    async fn failure_in_the_middle_does_not_leak() {
        let outcomes = dispatch(
            &registry(),
            vec![
                call("add", json!({"a": 1, "b": 2})),
                call("explode", json!({})),
                call("add", json!({"a": 3, "b": 4})),
            ],
        )
        .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].value(), Some(&json!(3)));
        assert_eq!(
            outcomes[1],
            InvocationOutcome::ExecutionError {
                tool: "explode".into(),
                error: ToolError::Panicked("boom".into())
            }
        );
        assert_eq!(outcomes[2].value(), Some(&json!(7)));
    }

    #[tokio::test]
    async fn timeout_is_its_own_execution_error() {
        let dispatcher = Dispatcher::new().with_timeout(Duration::from_millis(20));
        let outcomes = dispatcher
            .dispatch(
                &registry(),
                vec![call("sleepy", Value::Null), call("add", json!({"a": 1, "b": 2}))],
            )
            .await;

        assert_eq!(
            outcomes[0],
            InvocationOutcome::ExecutionError {
                tool: "sleepy".into(),
                error: ToolError::Timeout(20)
            }
        );
        assert!(outcomes[1].is_success());
    }

    #[tokio::test]
    async fn record_mismatch_is_an_execution_error() {
        let outcomes = dispatch(&registry(), vec![call("mismatched", json!({"a": 1}))]).await;
        assert!(matches!(
            &outcomes[0],
            InvocationOutcome::ExecutionError {
                tool,
                error: ToolError::InvalidInput(_),
            } if tool == "mismatched"
        ));
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = InvocationOutcome::ExecutionError {
            tool: "divide".into(),
            error: ToolError::Execution("division by zero".into()),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "execution_error");
        assert_eq!(value["tool"], "divide");
        assert_eq!(value["error"]["kind"], "execution");
        assert_eq!(value["error"]["detail"], "division by zero");
    }
}
