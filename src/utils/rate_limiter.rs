use std::num::NonZeroU32;
use std::time::Duration;

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use tracing::debug;

/// Enforces a minimum spacing between calls to a rate-limited upstream.
///
/// Holds its own GCRA state; share it behind an `Arc` between every client
/// that talks to the same upstream. A zero interval disables throttling.
pub struct MinIntervalRateLimiter {
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl MinIntervalRateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        // burst of one: a call is released at most once per interval
        let limiter = Quota::with_period(min_interval)
            .map(|quota| RateLimiter::direct(quota.allow_burst(NonZeroU32::MIN)));
        if limiter.is_none() {
            debug!("Upstream rate limiting disabled");
        }
        Self { limiter }
    }

    /// Wait until a call is allowed.
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}
