use std::sync::Arc;

use tracing::debug;

use crate::error::AppError;
use crate::models::ProtocolScoreRecord;
use crate::services::ProtocolReader;
use crate::utils::ProtocolCache;

/// A record plus whether it came from the cache.
#[derive(Debug, Clone)]
pub struct CachedLookup {
    pub record: ProtocolScoreRecord,
    pub cached: bool,
}

/// Read API over stored scores; single-protocol lookups go through the cache.
pub struct ProtocolService {
    reader: Arc<dyn ProtocolReader>,
    cache: ProtocolCache,
}

impl ProtocolService {
    pub fn new(reader: Arc<dyn ProtocolReader>, cache: ProtocolCache) -> Self {
        Self { reader, cache }
    }

    /// Every stored record, highest score first.
    pub async fn list_protocols(&self) -> Result<Vec<ProtocolScoreRecord>, AppError> {
        self.reader.list_protocols().await
    }

    pub async fn get_protocol(&self, slug: &str) -> Result<CachedLookup, AppError> {
        if let Some(record) = self.cache.get(slug).await {
            debug!(protocol = %slug, "Protocol cache hit");
            return Ok(CachedLookup { record, cached: true });
        }

        let generation = self.cache.generation();
        let record = self
            .reader
            .get_protocol(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Protocol '{}' not found", slug)))?;

        self.cache.insert_if_current(record.clone(), generation).await;
        Ok(CachedLookup { record, cached: false })
    }
}
