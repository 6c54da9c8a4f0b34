use serde::Deserialize;
use std::time::Duration;

/// Fully resolved mirror configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub mirror: MirrorConfig,
    pub targets: Vec<Target>,
}

/// On-disk configuration shape, before defaults are merged into targets
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub defaults: Defaults,

    pub mirror: MirrorConfig,

    #[serde(default, rename = "target")]
    pub targets: Vec<TargetSpec>,
}

/// Mirror process configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    /// Root directory under which each target's tree is written
    #[serde(rename = "data-path")]
    pub data_path: String,
}

/// Default values applied to every target that leaves a field unset
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Defaults {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Transfer rate cap, e.g. "500k"; empty or unparsable means unlimited
    #[serde(rename = "rate-limit")]
    pub rate_limit: String,

    /// Retry attempts for transient fetch failures
    pub retries: u32,

    /// Maximum recursion depth; -1 means unlimited
    #[serde(rename = "max-depth")]
    pub max_depth: i64,

    /// Per-request timeout in seconds
    pub timeout: u64,

    /// Pause between requests in seconds (the root request is never paced)
    #[serde(rename = "wait-between-requests")]
    pub wait_between_requests: u64,

    /// Probe remote metadata and skip unchanged files
    #[serde(rename = "check-changes")]
    pub check_changes: bool,

    // wget-parity flags carried in the configuration; the crawl algorithm
    // does not consult them (see DESIGN.md).
    pub timestamping: bool,

    #[serde(rename = "no-clobber")]
    pub no_clobber: bool,

    #[serde(rename = "continue-download")]
    pub continue_download: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            user_agent:
                "Mozilla/5.0 (compatible; HttpMirror/1.0) Friendly Educational Mirror".to_string(),
            rate_limit: "500k".to_string(),
            retries: 3,
            max_depth: 5,
            timeout: 30,
            wait_between_requests: 1,
            check_changes: true,
            timestamping: true,
            no_clobber: true,
            continue_download: true,
        }
    }
}

/// A single `[[target]]` entry as written in the configuration file
#[derive(Debug, Clone, Deserialize)]
pub struct TargetSpec {
    /// Filesystem-safe identifier; names the directory under the data path
    pub name: String,

    /// Absolute root URL of the remote directory listing
    pub url: String,

    #[serde(rename = "user-agent")]
    pub user_agent: Option<String>,

    #[serde(rename = "rate-limit")]
    pub rate_limit: Option<String>,

    pub retries: Option<u32>,

    #[serde(rename = "max-depth")]
    pub max_depth: Option<i64>,

    pub timeout: Option<u64>,

    #[serde(rename = "wait-between-requests")]
    pub wait_between_requests: Option<u64>,

    #[serde(rename = "check-changes")]
    pub check_changes: Option<bool>,

    pub timestamping: Option<bool>,

    #[serde(rename = "no-clobber")]
    pub no_clobber: Option<bool>,

    #[serde(rename = "continue-download")]
    pub continue_download: Option<bool>,
}

impl TargetSpec {
    /// Merges defaults into this spec, producing a fully resolved target
    pub fn resolve(self, defaults: &Defaults) -> Target {
        Target {
            name: self.name,
            url: self.url,
            user_agent: self
                .user_agent
                .unwrap_or_else(|| defaults.user_agent.clone()),
            rate_limit: self
                .rate_limit
                .unwrap_or_else(|| defaults.rate_limit.clone()),
            retries: self.retries.unwrap_or(defaults.retries),
            max_depth: self.max_depth.unwrap_or(defaults.max_depth),
            timeout: self.timeout.unwrap_or(defaults.timeout),
            wait_between_requests: self
                .wait_between_requests
                .unwrap_or(defaults.wait_between_requests),
            check_changes: self.check_changes.unwrap_or(defaults.check_changes),
            timestamping: self.timestamping.unwrap_or(defaults.timestamping),
            no_clobber: self.no_clobber.unwrap_or(defaults.no_clobber),
            continue_download: self
                .continue_download
                .unwrap_or(defaults.continue_download),
        }
    }
}

/// One configured remote root to mirror, with defaults already applied.
/// Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub url: String,
    pub user_agent: String,
    pub rate_limit: String,
    pub retries: u32,
    pub max_depth: i64,
    pub timeout: u64,
    pub wait_between_requests: u64,
    pub check_changes: bool,
    pub timestamping: bool,
    pub no_clobber: bool,
    pub continue_download: bool,
}

impl Target {
    /// Per-request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Pause between requests as a duration
    pub fn wait_duration(&self) -> Duration {
        Duration::from_secs(self.wait_between_requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, url: &str) -> TargetSpec {
        TargetSpec {
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
        }
    }

    #[test]
    fn test_resolve_applies_defaults() {
        let defaults = Defaults::default();
        let target = spec("ubuntu", "https://archive.example.org/ubuntu/").resolve(&defaults);

        assert_eq!(target.rate_limit, "500k");
        assert_eq!(target.retries, 3);
        assert_eq!(target.max_depth, 5);
        assert_eq!(target.timeout, 30);
        assert_eq!(target.wait_between_requests, 1);
        assert!(target.check_changes);
    }

    #[test]
    fn test_resolve_keeps_explicit_values() {
        let defaults = Defaults::default();
        let mut raw = spec("debian", "https://archive.example.org/debian/");
        raw.rate_limit = Some("2m".to_string());
        raw.max_depth = Some(-1);
        raw.check_changes = Some(false);

        let target = raw.resolve(&defaults);
        assert_eq!(target.rate_limit, "2m");
        assert_eq!(target.max_depth, -1);
        assert!(!target.check_changes);
        // Untouched fields still come from defaults
        assert_eq!(target.timeout, 30);
    }

    #[test]
    fn test_durations() {
        let defaults = Defaults::default();
        let target = spec("t", "https://example.org/").resolve(&defaults);
        assert_eq!(target.timeout(), Duration::from_secs(30));
        assert_eq!(target.wait_duration(), Duration::from_secs(1));
    }
}
