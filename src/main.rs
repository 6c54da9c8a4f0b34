//! http-mirror updater entry point
//!
//! Loads the mirror configuration and processes every configured target
//! strictly sequentially, then reports a summary and exits non-zero if any
//! target's root fetch failed.

use anyhow::bail;
use clap::Parser;
use http_mirror::config::{load_config, Config};
use http_mirror::crawler::mirror_target;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// http-mirror: mirror HTTP directory listings to local storage
///
/// Walks each configured target's autoindex tree, downloading only files
/// that changed since the last run, at a bounded transfer rate.
#[derive(Parser, Debug)]
#[command(name = "http-mirror")]
#[command(version = "1.0.0")]
#[command(about = "Mirror HTTP directory listings to local storage", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Overall runtime budget in minutes; the run is cancelled once exceeded
    #[arg(long, default_value_t = 30)]
    max_runtime: u64,

    /// Validate config and show what would be mirrored without fetching
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!(
        "Configuration loaded: {} targets, data path {}",
        config.targets.len(),
        config.mirror.data_path
    );

    if cli.dry_run {
        print_plan(&config);
        return Ok(());
    }

    run_mirrors(&config, cli.max_runtime).await
}

/// Sets up the tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("http_mirror=info,warn"),
            1 => EnvFilter::new("http_mirror=debug,info"),
            2 => EnvFilter::new("http_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Prints the dry-run plan: validated targets and their policies
fn print_plan(config: &Config) {
    println!("=== http-mirror Dry Run ===\n");
    println!("Data path: {}\n", config.mirror.data_path);
    println!("Targets ({}):", config.targets.len());

    for target in &config.targets {
        println!("  - {} <- {}", target.name, target.url);
        println!(
            "    depth: {}, rate: {}, timeout: {}s, wait: {}s, retries: {}, check-changes: {}",
            target.max_depth,
            if target.rate_limit.is_empty() {
                "unlimited"
            } else {
                target.rate_limit.as_str()
            },
            target.timeout,
            target.wait_between_requests,
            target.retries,
            target.check_changes
        );
    }

    println!("\n✓ Configuration is valid");
}

/// Mirrors all targets sequentially under a shared runtime budget
async fn run_mirrors(config: &Config, max_runtime_minutes: u64) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    // Cancel the whole run once the budget is spent. Each target sees the
    // same token, so an overrunning early target starves later ones rather
    // than extending the process lifetime.
    let deadline = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(max_runtime_minutes * 60)).await;
        tracing::warn!("Runtime budget of {}min exceeded, cancelling", max_runtime_minutes);
        deadline.cancel();
    });

    let data_path = Path::new(&config.mirror.data_path);
    let total = config.targets.len();
    let mut failures = Vec::new();

    for (index, target) in config.targets.iter().enumerate() {
        tracing::info!(
            "Mirroring target {}/{}: {} ({})",
            index + 1,
            total,
            target.name,
            target.url
        );

        match mirror_target(data_path, target, &cancel).await {
            Ok(stats) => {
                if stats.errors > 0 {
                    tracing::warn!(
                        "Target {} completed with {} errors",
                        target.name,
                        stats.errors
                    );
                }
            }
            Err(e) => {
                tracing::error!("Failed to mirror target {}: {}", target.name, e);
                failures.push((target.name.clone(), e));
            }
        }
    }

    if !failures.is_empty() {
        tracing::error!(
            "Mirror process completed with failures: {} succeeded, {} failed",
            total - failures.len(),
            failures.len()
        );
        bail!("{} of {} targets failed", failures.len(), total);
    }

    tracing::info!("Mirror process completed successfully ({} targets)", total);
    Ok(())
}
