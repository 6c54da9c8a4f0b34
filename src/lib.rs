//! http-mirror: a change-aware HTTP directory-listing mirror
//!
//! This crate recursively mirrors web-server autoindex trees to local
//! storage, downloading only resources that changed since the last run,
//! at a bounded transfer rate.

pub mod client;
pub mod config;
pub mod crawler;
pub mod paths;
pub mod stats;

use thiserror::Error;

/// Main error type for mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to parse URL {url}: {source}")]
    Parse {
        url: String,
        source: url::ParseError,
    },

    #[error("Security rejection: {0}")]
    SecurityRejection(String),

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Mirror run cancelled")]
    Cancelled,
}

impl MirrorError {
    /// Returns true if this error must unwind the entire recursive walk
    /// instead of being absorbed at the directory level that produced it.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, MirrorError::Cancelled)
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use client::{FetchOutcome, MirrorClient, RemoteResourceInfo};
pub use config::{Config, Target};
pub use crawler::mirror_target;
pub use stats::MirrorStats;
