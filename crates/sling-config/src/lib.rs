//! sling-config: TOML configuration for Sling.
//!
//! A global `config.toml` is merged with an optional per-project
//! `.sling/config.toml` over built-in defaults, then validated.

pub mod config;
pub mod error;
pub mod load;
pub mod merge;
pub mod validate;

pub use config::{AdapterConfig, ClientConfig, Config, LogConfig, LogLevel, RequestConfig};
pub use error::ConfigError;
pub use load::{load_config, load_file, load_from_str};
