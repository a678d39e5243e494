pub mod collaborators;
pub mod metrics_source;
pub mod protocol_service;
pub mod refresh_service;

pub use collaborators::*;
pub use metrics_source::{DefiLlamaClient, MetricsSource};
pub use protocol_service::{CachedLookup, ProtocolService};
pub use refresh_service::{select_batch, RefreshConfig, RefreshOrchestrator};
