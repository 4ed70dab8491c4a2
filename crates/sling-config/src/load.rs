use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::ConfigError;
use crate::merge::merge_configs;
use crate::validate::validate;

/// Directory searched for a per-project config file.
const PROJECT_DIR_NAME: &str = ".sling";

/// Content written into a newly-created default config file.
const DEFAULT_CONFIG_CONTENT: &str = r#"# Sling configuration
# Uncomment and edit settings below to override defaults.

# [client]
# client_id = "sling"
# client_name = "Sling"
# adapter_id = "debug"
# locale = "en-US"

# [request]
# timeout_secs = 30

# [adapter]
# command = "lldb-dap"
# args = []

# [launch]
# program = "target/debug/app"
# stopOnEntry = false

# [log]
# level = "info"
"#;

/// Load and merge configuration.
///
/// 1. Reads the global config from `config_dir/config.toml`, creating it
///    with commented-out defaults if it does not exist.
/// 2. Optionally reads a project config from
///    `project_dir/.sling/config.toml`, walking upward.
/// 3. Merges: `Config::default() <- global <- project`.
/// 4. Validates the merged result.
///
/// # Errors
///
/// Returns [`ConfigError`] on I/O failure, parse failure, or
/// validation failure.
pub fn load_config(config_dir: &Path, project_dir: Option<&Path>) -> Result<Config, ConfigError> {
    let global_path = config_dir.join("config.toml");

    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir)?;
    }

    if !global_path.exists() {
        std::fs::write(&global_path, DEFAULT_CONFIG_CONTENT)
            .map_err(|source| ConfigError::WriteDefault {
                path: global_path.clone(),
                source,
            })?;
        tracing::info!("created default config at {}", global_path.display());
    }

    let mut config = Config::default();

    let global_content = std::fs::read_to_string(&global_path)?;
    if has_non_comment_content(&global_content) {
        config = merge_configs(&config, &global_content)?;
    }

    if let Some(project_path) = project_dir.and_then(find_project_config) {
        tracing::debug!("merging project config {}", project_path.display());
        let project_content = std::fs::read_to_string(&project_path)?;
        config = merge_configs(&config, &project_content)?;
    }

    validate(&config).map_err(first_error)?;
    Ok(config)
}

/// Load a single config file, without defaults file creation or project
/// lookup.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] if `path` does not exist.
pub fn load_file(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    load_from_str(&std::fs::read_to_string(path)?)
}

/// Parse a TOML string directly into a validated [`Config`].
///
/// # Errors
///
/// Returns [`ConfigError`] on parse or validation failure.
pub fn load_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate(&config).map_err(first_error)?;
    Ok(config)
}

fn first_error(errors: Vec<ConfigError>) -> ConfigError {
    errors
        .into_iter()
        .next()
        .unwrap_or_else(|| ConfigError::Validation {
            field: "unknown".to_string(),
            message: "validation failed".to_string(),
        })
}

/// Walk from `start` upward looking for `.sling/config.toml`.
fn find_project_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_DIR_NAME).join("config.toml"))
        .find(|candidate| candidate.exists())
}

/// Returns `true` when the content has at least one
/// non-empty, non-comment line.
fn has_non_comment_content(content: &str) -> bool {
    content.lines().any(|l| {
        let trimmed = l.trim();
        !trimmed.is_empty() && !trimmed.starts_with('#')
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_config_creates_default_when_missing() {
        let tmp = TempDir::new().unwrap();
        let cfg_dir = tmp.path().join("config");

        let config = load_config(&cfg_dir, None).unwrap();
        assert_eq!(config, Config::default());
        assert!(cfg_dir.join("config.toml").exists());
    }

    #[test]
    fn load_config_reads_existing_global() {
        let tmp = TempDir::new().unwrap();
        let cfg_dir = tmp.path().join("config");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(
            cfg_dir.join("config.toml"),
            "[adapter]\ncommand = \"lldb-dap\"\n",
        )
        .unwrap();

        let config = load_config(&cfg_dir, None).unwrap();
        assert_eq!(config.adapter.command.as_deref(), Some("lldb-dap"));
        assert_eq!(config.request.timeout_secs, 30);
    }

    #[test]
    fn load_config_merges_project_over_global() {
        let tmp = TempDir::new().unwrap();
        let cfg_dir = tmp.path().join("config");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(
            cfg_dir.join("config.toml"),
            "[request]\ntimeout_secs = 60\n\n[launch]\ncwd = \"/work\"\n",
        )
        .unwrap();

        let proj_dir = tmp.path().join("project");
        let sling_dir = proj_dir.join(PROJECT_DIR_NAME);
        std::fs::create_dir_all(&sling_dir).unwrap();
        std::fs::write(
            sling_dir.join("config.toml"),
            "[request]\ntimeout_secs = 10\n\n[launch]\nprogram = \"app\"\n",
        )
        .unwrap();

        let config = load_config(&cfg_dir, Some(&proj_dir)).unwrap();
        assert_eq!(config.request.timeout_secs, 10);
        assert_eq!(config.launch["cwd"].as_str(), Some("/work"));
        assert_eq!(config.launch["program"].as_str(), Some("app"));
    }

    #[test]
    fn load_config_rejects_invalid_merged_values() {
        let tmp = TempDir::new().unwrap();
        let cfg_dir = tmp.path().join("config");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(cfg_dir.join("config.toml"), "[request]\ntimeout_secs = 0\n").unwrap();

        let err = load_config(&cfg_dir, None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "request.timeout_secs"));
    }

    #[test]
    fn load_file_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.toml");
        assert!(matches!(load_file(&missing), Err(ConfigError::NotFound(p)) if p == missing));
    }

    #[test]
    fn load_from_str_parses_valid_toml() {
        let config = load_from_str("[client]\nadapter_id = \"go\"\n").unwrap();
        assert_eq!(config.client.adapter_id, "go");
    }

    #[test]
    fn load_from_str_rejects_invalid_toml() {
        assert!(matches!(load_from_str("{{bad}}"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn load_from_str_rejects_invalid_values() {
        assert!(load_from_str("[client]\nadapter_id = \"\"\n").is_err());
    }

    #[test]
    fn find_project_config_walks_up() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("repo");
        let sling = root.join(PROJECT_DIR_NAME);
        std::fs::create_dir_all(&sling).unwrap();
        std::fs::write(sling.join("config.toml"), "[log]\nlevel = \"debug\"\n").unwrap();

        let deep = root.join("src").join("module");
        std::fs::create_dir_all(&deep).unwrap();

        let found = find_project_config(&deep).unwrap();
        assert!(found.ends_with(".sling/config.toml"));
        assert!(found.starts_with(&root));
    }

    #[test]
    fn default_config_content_is_comment_only() {
        assert!(!has_non_comment_content(DEFAULT_CONFIG_CONTENT));
    }

    #[test]
    fn default_config_content_uncommented_is_valid() {
        let uncommented: String = DEFAULT_CONFIG_CONTENT
            .lines()
            .filter_map(|l| l.strip_prefix("# "))
            .filter(|l| l.starts_with('[') || l.contains(" = "))
            .map(|l| format!("{l}\n"))
            .collect();
        let config = load_from_str(&uncommented).unwrap();
        assert_eq!(config.adapter.command.as_deref(), Some("lldb-dap"));
        assert_eq!(config.client.locale.as_deref(), Some("en-US"));
    }

    #[test]
    fn has_non_comment_content_detects_values() {
        assert!(!has_non_comment_content(""));
        assert!(!has_non_comment_content("# comment\n"));
        assert!(has_non_comment_content("# comment\n[log]\n"));
    }
}
