use thiserror::Error;

/// Errors from completion engine calls.
///
/// All of these abort the current turn only.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// The engine could not be reached.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// The engine answered with an error status.
    #[error("engine api: {0}")]
    Api(String),

    /// The engine's output could not be read as a completion.
    #[error("malformed engine response: {0}")]
    MalformedResponse(String),
}

impl ModelError {
    /// Whether retrying the same request could succeed.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
