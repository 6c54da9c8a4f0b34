//! Change-aware, rate-limited HTTP fetch client
//!
//! One [`MirrorClient`] exists per target run. It issues `HEAD` probes to
//! read remote metadata, decides whether a local copy is stale, and streams
//! `GET` bodies to disk through the per-target token bucket.

use crate::client::limiter::{parse_rate_limit, TokenBucket};
use crate::config::Target;
use crate::{MirrorError, Result};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED};
use reqwest::{Client, Response};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Delay before the first retry; grows linearly with the attempt number
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Metadata for a remote resource, produced by a `HEAD` probe
///
/// Ephemeral: used once to decide whether to download, never persisted.
#[derive(Debug, Clone)]
pub struct RemoteResourceInfo {
    pub url: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub size: Option<u64>,
    /// Read from the response but not currently consulted by change detection
    pub etag: Option<String>,
    pub content_type: String,
}

/// Outcome of a change-gated download request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The body was transferred; `bytes` is the amount written to disk
    Downloaded { bytes: u64 },
    /// Change detection found the local copy current; nothing transferred
    UpToDate,
}

/// A fetched page, with the body retained only when it is HTML
#[derive(Debug)]
pub struct FetchedPage {
    pub content_type: String,
    pub html: Option<String>,
}

impl FetchedPage {
    /// Returns true when the response looked like a directory-listing page
    pub fn is_html(&self) -> bool {
        self.html.is_some()
    }
}

/// HTTP client bound to a single mirror target
pub struct MirrorClient {
    http: Client,
    limiter: Option<Mutex<TokenBucket>>,
    target: Target,
}

impl MirrorClient {
    /// Builds a client for the given target
    ///
    /// The user agent, timeout, and rate limit all come from the target
    /// descriptor. A zero or unparsable rate limit disables the bucket.
    pub fn new(target: &Target) -> Result<Self> {
        let http = Client::builder()
            .user_agent(&target.user_agent)
            .timeout(target.timeout())
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| MirrorError::Transport {
                url: target.url.clone(),
                source: e,
            })?;

        let limiter = match parse_rate_limit(&target.rate_limit) {
            0 => None,
            bytes_per_second => Some(Mutex::new(TokenBucket::new(bytes_per_second))),
        };

        Ok(Self {
            http,
            limiter,
            target: target.clone(),
        })
    }

    /// Fetches a URL's content for the crawler
    ///
    /// HTML bodies are read into memory for link extraction; any other
    /// content type only reports its `Content-Type`, and the caller is
    /// expected to download it through [`MirrorClient::download`].
    pub async fn fetch_page(&self, cancel: &CancellationToken, url: &str) -> Result<FetchedPage> {
        let response = self
            .send_with_retries(cancel, url, || {
                self.http.get(url).header(
                    ACCEPT,
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                )
            })
            .await?;

        let content_type = header_str(&response, CONTENT_TYPE);

        if !content_type.contains("text/html") {
            return Ok(FetchedPage {
                content_type,
                html: None,
            });
        }

        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(MirrorError::Cancelled),
            body = response.text() => body.map_err(|e| MirrorError::Transport {
                url: url.to_string(),
                source: e,
            })?,
        };

        Ok(FetchedPage {
            content_type,
            html: Some(body),
        })
    }

    /// Performs a metadata-only `HEAD` request
    pub async fn probe(
        &self,
        cancel: &CancellationToken,
        url: &str,
    ) -> Result<RemoteResourceInfo> {
        let response = self
            .send_with_retries(cancel, url, || self.http.head(url))
            .await?;

        let size = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let last_modified = parse_last_modified(&response);

        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(RemoteResourceInfo {
            url: url.to_string(),
            last_modified,
            size,
            etag,
            content_type: header_str(&response, CONTENT_TYPE),
        })
    }

    /// Decides whether a local file is stale relative to remote metadata
    ///
    /// Checks in order, short-circuiting on the first hit: the local file
    /// is absent; the remote copy is strictly newer; the sizes differ.
    pub fn needs_update(&self, local: &Path, info: &RemoteResourceInfo) -> Result<bool> {
        let metadata = match std::fs::metadata(local) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(MirrorError::Filesystem(e)),
        };

        if let Some(remote_mtime) = info.last_modified {
            let local_mtime: DateTime<Utc> = metadata.modified()?.into();
            if remote_mtime > local_mtime {
                return Ok(true);
            }
        }

        if let Some(remote_size) = info.size {
            if metadata.len() != remote_size {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Downloads a URL to a local path, gated by change detection
    ///
    /// With change detection enabled the transfer is skipped entirely when
    /// the local copy is current. The body streams through the token bucket
    /// chunk by chunk, and the local modification time is set from the
    /// response `Last-Modified` when present.
    ///
    /// An interrupted transfer leaves a truncated file behind; the next
    /// run's size comparison catches it and redownloads.
    pub async fn download(
        &self,
        cancel: &CancellationToken,
        url: &str,
        local: &Path,
    ) -> Result<FetchOutcome> {
        if self.target.check_changes {
            match self.probe(cancel, url).await {
                Ok(info) => match self.needs_update(local, &info) {
                    Ok(false) => {
                        tracing::debug!("Up to date, skipping: {}", local.display());
                        return Ok(FetchOutcome::UpToDate);
                    }
                    Ok(true) => {}
                    Err(e) => {
                        tracing::debug!("Change check failed for {}, downloading: {}", url, e);
                    }
                },
                Err(e) if e.is_cancellation() => return Err(e),
                Err(e) => {
                    tracing::debug!("Probe failed for {}, downloading anyway: {}", url, e);
                }
            }
        }

        if let Some(parent) = local.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let response = self
            .send_with_retries(cancel, url, || self.http.get(url))
            .await?;

        let last_modified = parse_last_modified(&response);

        let mut file = std::fs::File::create(local)?;
        let mut stream = response.bytes_stream();
        let mut bytes: u64 = 0;

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => return Err(MirrorError::Cancelled),
                chunk = stream.next() => chunk,
            };

            let chunk = match chunk {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    return Err(MirrorError::Transport {
                        url: url.to_string(),
                        source: e,
                    })
                }
                None => break,
            };

            if let Some(limiter) = &self.limiter {
                limiter.lock().await.acquire(chunk.len(), cancel).await?;
            }

            file.write_all(&chunk)?;
            bytes += chunk.len() as u64;
        }

        file.flush()?;

        if let Some(mtime) = last_modified {
            if let Err(e) = file.set_modified(mtime.into()) {
                tracing::debug!("Could not set mtime on {}: {}", local.display(), e);
            }
        }

        Ok(FetchOutcome::Downloaded { bytes })
    }

    /// Sends a request, retrying transport failures and 5xx responses
    ///
    /// The configured retry count bounds re-attempts; 4xx responses and
    /// cancellation are returned immediately.
    async fn send_with_retries<F>(
        &self,
        cancel: &CancellationToken,
        url: &str,
        build: F,
    ) -> Result<Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let sent = tokio::select! {
                _ = cancel.cancelled() => return Err(MirrorError::Cancelled),
                sent = build().send() => sent,
            };

            let error = match sent {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let error = MirrorError::HttpStatus {
                        url: url.to_string(),
                        status: status.as_u16(),
                    };
                    if !status.is_server_error() {
                        return Err(error);
                    }
                    error
                }
                Err(e) => MirrorError::Transport {
                    url: url.to_string(),
                    source: e,
                },
            };

            if attempt > self.target.retries {
                return Err(error);
            }

            tracing::debug!(
                "Attempt {}/{} for {} failed, retrying: {}",
                attempt,
                self.target.retries + 1,
                url,
                error
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(MirrorError::Cancelled),
                _ = tokio::time::sleep(RETRY_BACKOFF * attempt) => {}
            }
        }
    }
}

fn header_str(response: &Response, name: reqwest::header::HeaderName) -> String {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

/// Parses an RFC 1123 `Last-Modified` header, ignoring malformed values
fn parse_last_modified(response: &Response) -> Option<DateTime<Utc>> {
    response
        .headers()
        .get(LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Defaults, TargetSpec};
    use chrono::TimeZone;
    use std::time::SystemTime;

    fn test_target(rate_limit: &str) -> Target {
        TargetSpec {
            name: "test".to_string(),
            url: "https://example.org/pub/".to_string(),
            user_agent: None,
            rate_limit: Some(rate_limit.to_string()),
            retries: Some(0),
            max_depth: None,
            timeout: None,
            wait_between_requests: Some(0),
            check_changes: None,
            timestamping: None,
            no_clobber: None,
            continue_download: None,
        }
        .resolve(&Defaults::default())
    }

    fn info(last_modified: Option<DateTime<Utc>>, size: Option<u64>) -> RemoteResourceInfo {
        RemoteResourceInfo {
            url: "https://example.org/pub/file.txt".to_string(),
            last_modified,
            size,
            etag: None,
            content_type: "application/octet-stream".to_string(),
        }
    }

    #[test]
    fn test_client_without_rate_limit() {
        let client = MirrorClient::new(&test_target("")).unwrap();
        assert!(client.limiter.is_none());
    }

    #[test]
    fn test_client_with_rate_limit() {
        let client = MirrorClient::new(&test_target("500k")).unwrap();
        assert!(client.limiter.is_some());
    }

    #[test]
    fn test_needs_update_missing_file() {
        let client = MirrorClient::new(&test_target("")).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not-there.txt");

        assert!(client.needs_update(&missing, &info(None, Some(10))).unwrap());
    }

    #[test]
    fn test_needs_update_remote_newer() {
        let client = MirrorClient::new(&test_target("")).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("file.txt");
        std::fs::write(&local, b"12345").unwrap();

        let past = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let file = std::fs::File::options().write(true).open(&local).unwrap();
        file.set_modified(SystemTime::from(past)).unwrap();

        let newer = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(client
            .needs_update(&local, &info(Some(newer), Some(5)))
            .unwrap());
    }

    #[test]
    fn test_needs_update_current_copy() {
        let client = MirrorClient::new(&test_target("")).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("file.txt");
        std::fs::write(&local, b"12345").unwrap();

        let mtime = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let file = std::fs::File::options().write(true).open(&local).unwrap();
        file.set_modified(SystemTime::from(mtime)).unwrap();

        // Remote not newer (equal timestamp) and sizes match
        assert!(!client
            .needs_update(&local, &info(Some(mtime), Some(5)))
            .unwrap());
    }

    #[test]
    fn test_needs_update_size_mismatch_wins() {
        let client = MirrorClient::new(&test_target("")).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("file.txt");
        std::fs::write(&local, b"12345").unwrap();

        let mtime = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let file = std::fs::File::options().write(true).open(&local).unwrap();
        file.set_modified(SystemTime::from(mtime)).unwrap();

        // Timestamps agree but the size differs: stale regardless
        assert!(client
            .needs_update(&local, &info(Some(mtime), Some(999)))
            .unwrap());
    }

    #[test]
    fn test_needs_update_no_remote_metadata() {
        let client = MirrorClient::new(&test_target("")).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("file.txt");
        std::fs::write(&local, b"12345").unwrap();

        // Nothing to compare against: assume current
        assert!(!client.needs_update(&local, &info(None, None)).unwrap());
    }
}
