//! Declarations handed to the completion engine.

use super::{Registry, ToolDeclaration};

/// Export every registered declaration, in registration order.
///
/// Descriptions were checked at registration, so export cannot fail.
pub fn export(registry: &Registry) -> Vec<ToolDeclaration> {
    registry
        .all()
        .iter()
        .map(|entry| entry.declaration().clone())
        .collect()
}
