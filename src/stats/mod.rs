//! Per-run mirror statistics
//!
//! A [`MirrorStats`] value is created once per target run, threaded by
//! mutable reference through the recursive walk, and finalized by the
//! top-level caller. The walk is a single sequential task, so no
//! synchronization is involved; parallel targets each need their own value.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Counters accumulated over one mirror run for one target
#[derive(Debug, Clone)]
pub struct MirrorStats {
    /// Name of the target this run mirrored
    pub target: String,

    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Duration,

    pub files_downloaded: u64,
    pub files_skipped: u64,
    pub bytes_downloaded: u64,

    /// Non-fatal failures absorbed during the walk. A run can "succeed"
    /// with a non-zero error count; callers must inspect this to detect
    /// partial failure.
    pub errors: u64,
}

impl MirrorStats {
    /// Starts a new statistics record for a target run
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            start_time: Utc::now(),
            end_time: None,
            duration: Duration::ZERO,
            files_downloaded: 0,
            files_skipped: 0,
            bytes_downloaded: 0,
            errors: 0,
        }
    }

    /// Stamps the end time and computes the run duration
    pub fn finalize(&mut self) {
        let end = Utc::now();
        self.end_time = Some(end);
        self.duration = (end - self.start_time).to_std().unwrap_or(Duration::ZERO);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_zeroed() {
        let stats = MirrorStats::new("ubuntu");
        assert_eq!(stats.target, "ubuntu");
        assert_eq!(stats.files_downloaded, 0);
        assert_eq!(stats.files_skipped, 0);
        assert_eq!(stats.bytes_downloaded, 0);
        assert_eq!(stats.errors, 0);
        assert!(stats.end_time.is_none());
    }

    #[test]
    fn test_finalize_sets_duration() {
        let mut stats = MirrorStats::new("ubuntu");
        stats.finalize();
        assert!(stats.end_time.is_some());
        assert!(stats.end_time.unwrap() >= stats.start_time);
    }
}
