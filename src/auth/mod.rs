pub mod cron_secret;
pub mod middleware;

pub use cron_secret::{extract_bearer_token, CronSecret};
pub use middleware::cron_auth_middleware;
