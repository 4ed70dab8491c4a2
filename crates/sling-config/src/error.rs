use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why `config.toml` could not be turned into a [`Config`](crate::Config).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `--config` named a file that does not exist.
    #[error("no sling config at {}", .0.display())]
    NotFound(PathBuf),

    /// First run: the commented default `config.toml` could not be written.
    #[error("cannot write default sling config to {}: {source}", path.display())]
    WriteDefault {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Not TOML, or a table whose keys do not fit the config schema.
    #[error("invalid config TOML: {0}")]
    Parse(String),

    /// A setting parsed but is out of range, e.g. a zero request timeout.
    #[error("invalid setting `{field}`: {message}")]
    Validation {
        /// Dotted key, such as `request.timeout_secs`.
        field: String,
        message: String,
    },

    #[error("cannot read sling config: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_file() {
        let err = ConfigError::NotFound(PathBuf::from("/etc/sling/alt.toml"));
        assert_eq!(err.to_string(), "no sling config at /etc/sling/alt.toml");
    }

    #[test]
    fn write_default_keeps_io_source() {
        let err = ConfigError::WriteDefault {
            path: PathBuf::from("/ro/sling/config.toml"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only file system"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/ro/sling/config.toml"), "got: {msg}");
        assert!(msg.contains("read-only file system"), "got: {msg}");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn validation_names_the_setting() {
        let err = ConfigError::Validation {
            field: "client.adapter_id".into(),
            message: "must not be empty".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid setting `client.adapter_id`: must not be empty"
        );
    }

    #[test]
    fn io_errors_convert() {
        let err = ConfigError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(matches!(err, ConfigError::Io(_)));
        assert_eq!(err.to_string(), "cannot read sling config: gone");
    }
}
