//! Tool registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{RegistryError, Tool, ToolDeclaration};

/// A tool with the declaration captured at registration.
#[derive(Clone)]
pub struct RegisteredTool {
    declaration: ToolDeclaration,
    tool: Arc<dyn Tool>,
}

impl RegisteredTool {
    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    pub fn declaration(&self) -> &ToolDeclaration {
        &self.declaration
    }

    /// Shared handle to the callable.
    pub fn tool(&self) -> Arc<dyn Tool> {
        Arc::clone(&self.tool)
    }
}

impl fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("declaration", &self.declaration)
            .finish_non_exhaustive()
    }
}

/// Tools keyed by name, kept in registration order.
///
/// Registration takes `&mut self` and dispatch takes `&self`, so a registry
/// cannot change while a dispatch pass borrows it.
#[derive(Debug, Default)]
pub struct Registry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    ///
    /// On error the registry is left unchanged.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(tool))
    }

    /// Register an already shared tool.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let declaration = tool.declaration();
        check_declaration(&declaration)?;
        if self.index.contains_key(&declaration.name) {
            return Err(RegistryError::DuplicateName(declaration.name));
        }

        debug!(
            tool = declaration.name.as_str(),
            parameters = declaration.parameters.len(),
            "registered tool"
        );
        self.index
            .insert(declaration.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool { declaration, tool });
        Ok(())
    }

    /// Builder-style registration.
    pub fn with(mut self, tool: impl Tool + 'static) -> Result<Self, RegistryError> {
        self.register(tool)?;
        Ok(self)
    }

    /// Get a tool by name.
    pub fn lookup(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// All tools in registration order.
    pub fn all(&self) -> &[RegisteredTool] {
        &self.tools
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(RegisteredTool::name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn check_declaration(decl: &ToolDeclaration) -> Result<(), RegistryError> {
    let valid_name = !decl.name.is_empty()
        && decl
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid_name {
        return Err(RegistryError::InvalidName(decl.name.clone()));
    }
    if decl.description.trim().is_empty() {
        return Err(RegistryError::MissingDescription(decl.name.clone()));
    }
    for (i, param) in decl.parameters.iter().enumerate() {
        if decl.parameters[..i].iter().any(|p| p.name == param.name) {
            return Err(RegistryError::DuplicateParameter {
                tool: decl.name.clone(),
                parameter: param.name.clone(),
            });
        }
    }
    Ok(())
}
