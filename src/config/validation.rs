use crate::config::types::{Config, Target};
use crate::paths::is_valid_name;
use crate::ConfigError;
use url::Url;

/// Validates a fully resolved configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.mirror.data_path.is_empty() {
        return Err(ConfigError::Validation(
            "mirror data-path cannot be empty".to_string(),
        ));
    }

    if config.targets.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[target]] must be configured".to_string(),
        ));
    }

    for target in &config.targets {
        validate_target(target)?;
    }

    Ok(())
}

/// Validates a single target
fn validate_target(target: &Target) -> Result<(), ConfigError> {
    // The name becomes a directory under the data path, so it must be a
    // plain filesystem-safe component.
    if !is_valid_name(&target.name) {
        return Err(ConfigError::Validation(format!(
            "target name '{}' is not filesystem-safe",
            target.name
        )));
    }

    let url = Url::parse(&target.url).map_err(|e| {
        ConfigError::Validation(format!("target '{}' has invalid URL: {}", target.name, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "target '{}' URL must use http or https, got '{}'",
            target.name,
            url.scheme()
        )));
    }

    if target.timeout == 0 {
        return Err(ConfigError::Validation(format!(
            "target '{}' timeout must be at least 1 second",
            target.name
        )));
    }

    if target.max_depth < -1 {
        return Err(ConfigError::Validation(format!(
            "target '{}' max-depth must be -1 (unlimited) or non-negative, got {}",
            target.name, target.max_depth
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{Defaults, MirrorConfig, TargetSpec};

    fn make_config(name: &str, url: &str) -> Config {
        let spec = TargetSpec {
            name: name.to_string(),
            url: url.to_string(),
            user_agent: None,
            rate_limit: None,
            retries: None,
            max_depth: None,
            timeout: None,
            wait_between_requests: None,
            check_changes: None,
            timestamping: None,
            no_clobber: None,
            continue_download: None,
        };
        Config {
            mirror: MirrorConfig {
                data_path: "/data".to_string(),
            },
            targets: vec![spec.resolve(&Defaults::default())],
        }
    }

    #[test]
    fn test_valid_config() {
        let config = make_config("ubuntu", "https://archive.example.org/ubuntu/");
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_no_targets() {
        let mut config = make_config("ubuntu", "https://archive.example.org/ubuntu/");
        config.targets.clear();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_unsafe_target_name() {
        let config = make_config("../escape", "https://archive.example.org/");
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_url() {
        let config = make_config("ok", "not a url");
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let config = make_config("ok", "ftp://archive.example.org/");
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = make_config("ok", "https://archive.example.org/");
        config.targets[0].timeout = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_depth_below_unlimited() {
        let mut config = make_config("ok", "https://archive.example.org/");
        config.targets[0].max_depth = -2;
        assert!(validate(&config).is_err());
    }
}
