//! HTTP fetch client for mirror targets
//!
//! This module handles all network traffic for a mirror run:
//! - `HEAD` probes for remote metadata
//! - change detection against the local copy
//! - rate-limited `GET` downloads streamed to disk
//! - retry with backoff for transient failures

mod http;
mod limiter;

pub use http::{FetchOutcome, FetchedPage, MirrorClient, RemoteResourceInfo};
pub use limiter::{parse_rate_limit, TokenBucket};
