//! Tool declarations, registry and argument validation.

mod arguments;
pub mod errors;
mod export;
mod registry;
mod tool;
mod types;

pub use arguments::Arguments;
pub use errors::{ArgumentError, RegistryError, ToolError};
pub use export::export;
pub use registry::{RegisteredTool, Registry};
pub use tool::Tool;
pub use types::{ParamSpec, ParamType, ProposedInvocation, ToolDeclaration};
