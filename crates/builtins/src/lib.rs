//! Built-in toolsets.
//!
//! - **calculator**: integer arithmetic on two operands.
//! - **files**: create, list, search and measure files inside a workspace.

pub mod calculator;
pub mod files;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use runtime::{Registry, Renderer};
use serde::{Deserialize, Serialize};

pub use calculator::{Calculator, Operation};
pub use files::{FileOperation, FileTool, Workspace};

/// A named group of built-in tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toolset {
    Calculator,
    Files,
}

impl Toolset {
    pub const ALL: [Toolset; 2] = [Self::Calculator, Self::Files];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Calculator => "calculator",
            Self::Files => "files",
        }
    }
}

impl fmt::Display for Toolset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Toolset {
    type Err = runtime::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| runtime::Error::Config(format!("unknown toolset: {s}")))
    }
}

/// Build a registry holding the given toolsets.
///
/// Listing a toolset twice is a duplicate-name error, like any other
/// ambiguous registry.
pub fn registry(toolsets: &[Toolset], workspace: &Path) -> runtime::Result<Registry> {
    if toolsets.contains(&Toolset::Files) && !workspace.is_dir() {
        return Err(runtime::Error::Config(format!(
            "workspace {} is not a directory",
            workspace.display()
        )));
    }

    let mut registry = Registry::new();
    for toolset in toolsets {
        match toolset {
            Toolset::Calculator => {
                for tool in calculator::tools() {
                    registry.register(tool)?;
                }
            }
            Toolset::Files => {
                for tool in files::tools(Workspace::new(workspace)) {
                    registry.register(tool)?;
                }
            }
        }
    }
    Ok(registry)
}

/// Renderer with formatters for every built-in tool that has one.
pub fn renderer() -> Renderer {
    files::formatters(Renderer::new())
}
