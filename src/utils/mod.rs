pub mod caching;
pub mod fault_tolerance;
pub mod logging;
pub mod math;
pub mod monitoring;
pub mod rate_limiter;
pub mod slug;
pub mod time;

pub use caching::{CacheConfig, ProtocolCache};
pub use fault_tolerance::{retry_with_backoff, with_timeout, RetryConfig};
pub use logging::init_tracing;
pub use monitoring::RefreshMetrics;
pub use rate_limiter::MinIntervalRateLimiter;
pub use slug::slugify;
