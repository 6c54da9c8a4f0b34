//! Recursive directory-listing walk
//!
//! The walk is depth-first and fully sequential: one logical task descends
//! the remote tree, classifying each listing entry as a file or a
//! subdirectory and driving the fetch client. Failures below the root are
//! absorbed into the statistics record; only a root fetch failure or
//! cancellation unwinds the whole walk.

use crate::client::{FetchOutcome, MirrorClient};
use crate::config::Target;
use crate::crawler::parser::extract_links;
use crate::paths::{default_file_name, is_valid_name, is_within_root};
use crate::stats::MirrorStats;
use crate::{MirrorError, Result};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Mirrors a single target to `<data_path>/<target.name>/`
///
/// Returns the run statistics on completion. A non-zero
/// [`errors`](MirrorStats::errors) count signals partial failure; an `Err`
/// is returned only when the target's root resource could not be fetched
/// or the run was cancelled.
pub async fn mirror_target(
    data_path: &Path,
    target: &Target,
    cancel: &CancellationToken,
) -> Result<MirrorStats> {
    tracing::info!("Starting mirror for target {} ({})", target.name, target.url);

    let client = MirrorClient::new(target)?;

    let root_url = Url::parse(&target.url).map_err(|e| MirrorError::Parse {
        url: target.url.clone(),
        source: e,
    })?;

    let root_dir = data_path.join(&target.name);
    std::fs::create_dir_all(&root_dir)?;

    let mut stats = MirrorStats::new(&target.name);
    let result = walk(
        &client, target, &root_url, &root_dir, &root_dir, 0, &mut stats, cancel,
    )
    .await;
    stats.finalize();

    tracing::info!(
        "Mirror completed for {}: {} downloaded, {} skipped, {} bytes, {} errors in {:?}",
        target.name,
        stats.files_downloaded,
        stats.files_skipped,
        stats.bytes_downloaded,
        stats.errors,
        stats.duration
    );

    result.map(|()| stats)
}

/// Recursively mirrors one URL into one local directory
///
/// Boxed because async recursion needs an indirection; the recursion is
/// still plain sequential call nesting.
#[allow(clippy::too_many_arguments)]
fn walk<'a>(
    client: &'a MirrorClient,
    target: &'a Target,
    url: &'a Url,
    local_dir: &'a Path,
    root_dir: &'a Path,
    depth: i64,
    stats: &'a mut MirrorStats,
    cancel: &'a CancellationToken,
) -> BoxFuture<'a, Result<()>> {
    async move {
        if cancel.is_cancelled() {
            return Err(MirrorError::Cancelled);
        }

        // Reaching the depth bound stops this branch silently (-1 = unlimited).
        if target.max_depth >= 0 && depth >= target.max_depth {
            return Ok(());
        }

        // Pace requests below the root.
        if depth > 0 && target.wait_between_requests > 0 {
            tokio::select! {
                _ = cancel.cancelled() => return Err(MirrorError::Cancelled),
                _ = tokio::time::sleep(target.wait_duration()) => {}
            }
        }

        tracing::debug!("Processing {} at depth {}", url, depth);

        let page = match client.fetch_page(cancel, url.as_str()).await {
            Ok(page) => page,
            Err(e) => {
                if !e.is_cancellation() {
                    stats.errors += 1;
                }
                return Err(e);
            }
        };

        let html = match page.html {
            Some(html) => html,
            None => {
                // Not a listing: mirror the resource itself.
                tracing::debug!("Direct file ({}): {}", page.content_type, url);
                let local_path = local_dir.join(default_file_name(url));
                return download_file(client, url.as_str(), &local_path, stats, cancel).await;
            }
        };

        let links = extract_links(&html);

        // An HTML page without listing entries is a single file, not a
        // directory.
        if links.is_empty() {
            let local_path = local_dir.join(default_file_name(url));
            return download_file(client, url.as_str(), &local_path, stats, cancel).await;
        }

        tracing::debug!("Found {} entries under {}", links.len(), url);

        for link in links {
            let absolute = match url.join(&link) {
                Ok(absolute) => absolute,
                Err(e) => {
                    tracing::warn!("Unresolvable link '{}' under {}: {}", link, url, e);
                    stats.errors += 1;
                    continue;
                }
            };

            if link.ends_with('/') {
                let dir_name = link.trim_end_matches('/');
                let sub_dir = local_dir.join(dir_name);

                if let Err(e) = validate_entry(root_dir, &sub_dir, dir_name) {
                    tracing::warn!("Skipping directory {}: {}", absolute, e);
                    stats.errors += 1;
                    continue;
                }

                if let Err(e) = std::fs::create_dir_all(&sub_dir) {
                    tracing::warn!("Could not create {}: {}", sub_dir.display(), e);
                    stats.errors += 1;
                    continue;
                }

                if let Err(e) = walk(
                    client,
                    target,
                    &absolute,
                    &sub_dir,
                    root_dir,
                    depth + 1,
                    stats,
                    cancel,
                )
                .await
                {
                    if e.is_cancellation() {
                        return Err(e);
                    }
                    // The failed branch already counted its own error;
                    // siblings continue.
                    tracing::warn!("Failed to mirror subdirectory {}: {}", absolute, e);
                }
            } else {
                let file_name = link.rsplit('/').next().unwrap_or(&link);
                let local_path = local_dir.join(file_name);

                if let Err(e) = validate_entry(root_dir, &local_path, file_name) {
                    tracing::warn!("Skipping file {}: {}", absolute, e);
                    stats.errors += 1;
                    continue;
                }

                download_file(client, absolute.as_str(), &local_path, stats, cancel).await?;
            }
        }

        Ok(())
    }
    .boxed()
}

/// Runs both write gates on a listing entry before any filesystem operation
///
/// The basename check and the containment check are independent: a name can
/// be individually valid yet resolve outside the root, and vice versa.
fn validate_entry(root_dir: &Path, candidate: &Path, name: &str) -> Result<()> {
    if !is_valid_name(name) {
        return Err(MirrorError::SecurityRejection(format!(
            "unsafe name '{}'",
            name
        )));
    }

    if !is_within_root(root_dir, candidate) {
        return Err(MirrorError::SecurityRejection(format!(
            "path escapes target root: {}",
            candidate.display()
        )));
    }

    Ok(())
}

/// Downloads one file, folding the outcome into the statistics record
///
/// Download failures are absorbed here so sibling entries continue; only
/// cancellation propagates.
async fn download_file(
    client: &MirrorClient,
    url: &str,
    local: &Path,
    stats: &mut MirrorStats,
    cancel: &CancellationToken,
) -> Result<()> {
    match client.download(cancel, url, local).await {
        Ok(FetchOutcome::Downloaded { bytes }) => {
            tracing::debug!("Downloaded {} ({} bytes)", local.display(), bytes);
            stats.files_downloaded += 1;
            stats.bytes_downloaded += bytes;
            Ok(())
        }
        Ok(FetchOutcome::UpToDate) => {
            stats.files_skipped += 1;
            Ok(())
        }
        Err(e) if e.is_cancellation() => Err(e),
        Err(e) => {
            tracing::warn!("Failed to download {}: {}", url, e);
            stats.errors += 1;
            Ok(())
        }
    }
}
