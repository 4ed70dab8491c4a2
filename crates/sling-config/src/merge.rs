use crate::config::Config;
use crate::error::ConfigError;

/// Merge an overlay TOML fragment on top of a base [`Config`].
///
/// Values present in `overlay_toml` override those in `base`; missing
/// keys keep their `base` values. Both sides are turned into
/// [`toml::Value`] tables, deep-merged, and deserialized back, so the
/// free-form `[launch]` table merges key-by-key too.
pub fn merge_configs(base: &Config, overlay_toml: &str) -> Result<Config, ConfigError> {
    let mut base_val =
        toml::Value::try_from(base).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let overlay_val: toml::Value =
        toml::from_str(overlay_toml).map_err(|e| ConfigError::Parse(e.to_string()))?;

    merge_values(&mut base_val, &overlay_val);

    base_val
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))
}

/// Recursively merge `overlay` into `base`. Tables merge key-by-key;
/// anything else (arrays included) is replaced outright.
fn merge_values(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, val) in overlay_table {
                match base_table.get_mut(key) {
                    Some(base_val) => merge_values(base_val, val),
                    None => {
                        base_table.insert(key.clone(), val.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_empty_overlay_returns_base() {
        let base = Config::default();
        let merged = merge_configs(&base, "").expect("merge empty");
        assert_eq!(merged, base);
    }

    #[test]
    fn merge_overrides_one_field() {
        let base = Config::default();
        let merged = merge_configs(&base, "[request]\ntimeout_secs = 5\n").expect("merge");
        assert_eq!(merged.request.timeout_secs, 5);
        assert_eq!(merged.client, base.client);
        assert_eq!(merged.log, base.log);
    }

    #[test]
    fn merge_launch_tables_key_by_key() {
        let base = merge_configs(
            &Config::default(),
            "[launch]\nprogram = \"a.out\"\nstopOnEntry = true\n",
        )
        .expect("global");
        let merged = merge_configs(&base, "[launch]\nprogram = \"b.out\"\n").expect("project");
        assert_eq!(merged.launch["program"].as_str(), Some("b.out"));
        assert_eq!(merged.launch["stopOnEntry"].as_bool(), Some(true));
    }

    #[test]
    fn merge_replaces_arrays() {
        let base = merge_configs(
            &Config::default(),
            "[adapter]\ncommand = \"gdb\"\nargs = [\"-i\", \"dap\"]\n",
        )
        .expect("global");
        let merged = merge_configs(&base, "[adapter]\nargs = [\"--quiet\"]\n").expect("project");
        assert_eq!(merged.adapter.command.as_deref(), Some("gdb"));
        assert_eq!(merged.adapter.args, vec!["--quiet"]);
    }

    #[test]
    fn merge_invalid_overlay_returns_parse_error() {
        let result = merge_configs(&Config::default(), "{{invalid}}");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
