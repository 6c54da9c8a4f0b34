use crate::config::types::{Config, ConfigFile};
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;

/// Loads, resolves, and validates a configuration file
///
/// Each `[[target]]` entry is merged with the `[defaults]` table before
/// validation, so callers always receive fully resolved targets.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let file: ConfigFile = toml::from_str(&content)?;

    let config = Config {
        mirror: file.mirror,
        targets: file
            .targets
            .into_iter()
            .map(|spec| spec.resolve(&file.defaults))
            .collect(),
    };

    validate(&config)?;

    Ok(config)
}
