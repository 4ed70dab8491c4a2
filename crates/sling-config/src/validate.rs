use crate::config::Config;
use crate::error::ConfigError;

const TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=600;

/// Validate a [`Config`], returning all detected violations.
///
/// Returns `Ok(())` when the config is valid, or `Err` with a
/// vector of every validation error found.
pub fn validate(config: &Config) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.client.client_id.trim().is_empty() {
        errors.push(invalid("client.client_id", "must not be empty".into()));
    }

    if config.client.adapter_id.trim().is_empty() {
        errors.push(invalid("client.adapter_id", "must not be empty".into()));
    }

    if !TIMEOUT_RANGE.contains(&config.request.timeout_secs) {
        errors.push(invalid(
            "request.timeout_secs",
            format!("must be 1-600, got {}", config.request.timeout_secs),
        ));
    }

    if let Some(command) = &config.adapter.command {
        if command.trim().is_empty() {
            errors.push(invalid("adapter.command", "must not be empty when set".into()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::Validation {
        field: field.to_string(),
        message,
    }
}
