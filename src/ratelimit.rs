//! Process-wide token bucket shared by every upstream request.
//!
//! crt.sh throttles aggressive clients, so all collectors draw from one
//! bucket: tokens refill continuously at `per_second` up to `burst`, each
//! request takes one, and callers block until a token is available.

use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use crate::ExporterError;

/// Default refill rate: one request per second.
pub const DEFAULT_RATE_PER_SECOND: f64 = 1.0;
/// Default burst capacity.
pub const DEFAULT_BURST: u32 = 4;

/// Blocking token-bucket rate limiter, safe to share across threads.
#[derive(Debug)]
pub struct RateLimiter {
    per_second: f64,
    burst: u32,
    bucket: Mutex<Bucket>,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, now: Instant, per_second: f64, burst: u32) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * per_second).min(f64::from(burst));
        self.last_refill = now;
    }
}

impl RateLimiter {
    /// Creates a limiter that starts with a full bucket.
    ///
    /// # Errors
    ///
    /// Returns `ExporterError::Configuration` if `per_second` is not a
    /// positive finite number or `burst` is zero.
    pub fn new(per_second: f64, burst: u32) -> Result<RateLimiter, ExporterError> {
        if !per_second.is_finite() || per_second <= 0.0 {
            return Err(ExporterError::configuration(
                "rate",
                "requests per second must be greater than zero",
            ));
        }
        if burst == 0 {
            return Err(ExporterError::configuration(
                "burst",
                "burst must be at least one request",
            ));
        }
        Ok(RateLimiter {
            per_second,
            burst,
            bucket: Mutex::new(Bucket {
                tokens: f64::from(burst),
                last_refill: Instant::now(),
            }),
        })
    }

    pub fn per_second(&self) -> f64 {
        self.per_second
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }

    /// Takes a token if one is available right now.
    pub fn try_acquire(&self) -> bool {
        self.reserve().is_none()
    }

    /// Blocks until a token has been taken and returns how long it waited.
    pub fn acquire(&self) -> Duration {
        let start = Instant::now();
        while let Some(wait) = self.reserve() {
            thread::sleep(wait);
        }
        start.elapsed()
    }

    /// Takes a token, or returns how long until one is due.
    fn reserve(&self) -> Option<Duration> {
        // bucket state stays consistent even if a holder panicked
        let mut bucket = match self.bucket.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        bucket.refill(Instant::now(), self.per_second, self.burst);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            None
        } else {
            let missing = 1.0 - bucket.tokens;
            Some(Duration::from_secs_f64(missing / self.per_second))
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        RateLimiter {
            per_second: DEFAULT_RATE_PER_SECOND,
            burst: DEFAULT_BURST,
            bucket: Mutex::new(Bucket {
                tokens: f64::from(DEFAULT_BURST),
                last_refill: Instant::now(),
            }),
        }
    }
}
