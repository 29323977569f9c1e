//! Tool trait.

use super::{Arguments, ToolDeclaration, ToolError};
use serde_json::Value;

/// A local operation the model can call.
///
/// Implementations declare their parameters and execute with arguments that
/// have already been validated against that declaration. `call` runs on a
/// blocking thread, so it may touch the filesystem directly.
pub trait Tool: Send + Sync {
    /// Name, description and parameter schema.
    fn declaration(&self) -> ToolDeclaration;

    /// Execute with validated arguments.
    fn call(&self, args: Arguments) -> Result<Value, ToolError>;
}
