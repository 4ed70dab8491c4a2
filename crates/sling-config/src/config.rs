use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Log verbosity level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Most verbose.
    Trace,
    /// Debug messages.
    Debug,
    /// Informational messages (default).
    #[default]
    Info,
    /// Warnings only.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// The level's name as used in filter directives.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Identity the client announces in `initialize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// `clientID`.
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// `clientName`.
    #[serde(default = "default_client_name")]
    pub client_name: String,
    /// `adapterID`.
    #[serde(default = "default_adapter_id")]
    pub adapter_id: String,
    /// `locale`, e.g. `en-US`.
    #[serde(default)]
    pub locale: Option<String>,
}

fn default_client_id() -> String {
    "sling".to_string()
}

fn default_client_name() -> String {
    "Sling".to_string()
}

fn default_adapter_id() -> String {
    "debug".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            client_name: default_client_name(),
            adapter_id: default_adapter_id(),
            locale: None,
        }
    }
}

/// Request correlation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Seconds to wait for a response (1–600).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// The debug adapter process to spawn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Executable to run. The adapter must speak DAP on stdio.
    #[serde(default)]
    pub command: Option<String>,
    /// Command-line arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log verbosity level.
    #[serde(default)]
    pub level: LogLevel,
    /// Optional path to a log file.
    pub file: Option<PathBuf>,
}

/// Top-level Sling configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Client identity.
    #[serde(default)]
    pub client: ClientConfig,
    /// Request settings.
    #[serde(default)]
    pub request: RequestConfig,
    /// Debug adapter process.
    #[serde(default)]
    pub adapter: AdapterConfig,
    /// Arguments forwarded verbatim with `launch`.
    #[serde(default)]
    pub launch: toml::Table,
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// The per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request.timeout_secs)
    }
}
