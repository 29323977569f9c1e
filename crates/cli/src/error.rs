//! CLI error types.

use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration could not be read, parsed or validated.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Building the tool registry failed.
    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    /// The completion engine failed.
    #[error(transparent)]
    Model(#[from] runtime::ModelError),

    /// Output could not be serialized.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
