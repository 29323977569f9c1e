//! Completion engine adapters.
//!
//! Each provider implements the backend trait for its specific API.

mod ollama;

pub use ollama::{
    DEFAULT_HOST, DEFAULT_MODEL, OllamaBackend, OllamaBackendBuilder, parse_response,
};
