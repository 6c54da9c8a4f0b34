//! Configuration loading and validation
//!
//! Configuration is a TOML file with a `[mirror]` section, an optional
//! `[defaults]` section, and one `[[target]]` table per mirror target.
//! Defaults are merged into each target before validation, so the rest of
//! the crate only ever sees fully resolved [`Target`] values.

mod parser;
mod types;
mod validation;

pub use parser::load_config;
pub use types::{Config, Defaults, MirrorConfig, Target, TargetSpec};
pub use validation::validate;
