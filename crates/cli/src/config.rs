//! Configuration loading from toolbelt.toml.

use builtins::Toolset;
use runtime::providers::{DEFAULT_HOST, DEFAULT_MODEL};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE: &str = "toolbelt.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub dispatch: DispatchConfig,
    pub tools: ToolsConfig,
    pub log: LogConfig,
}

/// Completion engine configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the Ollama server.
    pub host: String,

    /// Model to use.
    pub model: String,

    /// Limit for one whole request, in seconds.
    pub timeout_secs: u64,

    /// Extra attempts when the engine is unreachable. Zero disables retries.
    pub retries: u32,

    /// Optional system prompt sent before the user message.
    pub system: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 120,
            retries: 0,
            system: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Per-invocation limit in seconds; absent means no limit.
    pub tool_timeout_secs: Option<u64>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            tool_timeout_secs: Some(30),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Toolsets to register, in order.
    pub enable: Vec<Toolset>,

    /// Root directory for the file tools.
    pub workspace: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enable: Toolset::ALL.to_vec(),
            workspace: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Fallback filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load `explicit` if given, else `toolbelt.toml` if present, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let default_path = Path::new(CONFIG_FILE);
        if default_path.exists() {
            Self::load(default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `OLLAMA_HOST` and `TOOLBELT_MODEL` from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("OLLAMA_HOST").filter(|v| !v.is_empty()) {
            self.backend.host = host;
        }
        if let Some(model) = lookup("TOOLBELT_MODEL").filter(|v| !v.is_empty()) {
            self.backend.model = model;
        }
    }

    /// Reject values that would only fail later, mid-session.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.model.trim().is_empty() {
            return Err(ConfigError::Invalid("backend.model must not be empty".into()));
        }
        let host = &self.backend.host;
        if !(host.starts_with("http://") || host.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "backend.host must be an http(s) URL, got {host:?}"
            )));
        }
        if self.backend.timeout_secs == 0 || self.dispatch.tool_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid("timeouts must be at least one second".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.dispatch.tool_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}
