//! Token-bucket throughput limiting
//!
//! One bucket exists per [`MirrorClient`](crate::client::MirrorClient), so
//! the cap is logically per target. Capacity and refill rate are both the
//! configured bytes/second: a full second of transfer can burst, after
//! which reads block until tokens accumulate.

use crate::MirrorError;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Parses a rate-limit string like "500k" into bytes per second
///
/// Suffixes `k`, `m`, and `g` (case-insensitive) multiply by 1024, 1024²,
/// and 1024³. Empty input, a missing number, or an unrecognized suffix all
/// yield 0, which callers treat as unlimited.
pub fn parse_rate_limit(rate: &str) -> u64 {
    let rate = rate.trim().to_lowercase();

    let (number, multiplier) = if let Some(number) = rate.strip_suffix('k') {
        (number, 1024)
    } else if let Some(number) = rate.strip_suffix('m') {
        (number, 1024 * 1024)
    } else if let Some(number) = rate.strip_suffix('g') {
        (number, 1024 * 1024 * 1024)
    } else {
        (rate.as_str(), 1)
    };

    match number.parse::<u64>() {
        Ok(value) => value.saturating_mul(multiplier),
        Err(_) => 0,
    }
}

/// A refillable budget of bytes consumed per unit time
///
/// The mirror run is a single sequential task, so the bucket needs no
/// internal synchronization; it blocks the caller until enough tokens
/// accumulate for the requested amount.
#[derive(Debug)]
pub struct TokenBucket {
    /// Refill rate in bytes per second; also the bucket capacity
    rate: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a full bucket with the given bytes/second budget
    pub fn new(bytes_per_second: u64) -> Self {
        let rate = bytes_per_second as f64;
        Self {
            rate,
            tokens: rate,
            last_refill: Instant::now(),
        }
    }

    /// Blocks until `amount` bytes worth of tokens have been consumed
    ///
    /// Amounts larger than the bucket capacity are drained in
    /// capacity-sized installments, so a single oversized read chunk still
    /// respects the configured rate instead of failing.
    pub async fn acquire(
        &mut self,
        amount: usize,
        cancel: &CancellationToken,
    ) -> Result<(), MirrorError> {
        let mut remaining = amount as f64;

        while remaining > 0.0 {
            self.refill();

            let want = remaining.min(self.rate);
            if self.tokens >= want {
                self.tokens -= want;
                remaining -= want;
                continue;
            }

            let deficit = want - self.tokens;
            let wait = Duration::from_secs_f64(deficit / self.rate);

            tokio::select! {
                _ = cancel.cancelled() => return Err(MirrorError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }

        Ok(())
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.rate);
        self.last_refill = now;
    }
}
