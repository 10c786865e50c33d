use crate::domain::ports::FeatureCache;
use crate::domain::types::{FeatureVector, SourceMode};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry {
    fields: HashMap<String, String>,
    expires_at: Instant,
}

/// In-process feature cache holding one hash-style entry per slot
pub struct InMemoryFeatureCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl std::fmt::Debug for InMemoryFeatureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryFeatureCache")
            .field("entries", &"<RwLock>")
            .finish()
    }
}

impl InMemoryFeatureCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Raw field map under `slot` if it has not expired.
    fn fields(&self, slot: SourceMode) -> Option<HashMap<String, String>> {
        let now = Instant::now();
        let lookup = |entries: &HashMap<String, CacheEntry>| {
            entries
                .get(slot.cache_key())
                .filter(|e| e.expires_at > now)
                .map(|e| e.fields.clone())
        };

        match self.entries.read() {
            Ok(guard) => lookup(&*guard),
            Err(poisoned) => lookup(&*poisoned.into_inner()),
        }
    }
}

impl Default for InMemoryFeatureCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeatureCache for InMemoryFeatureCache {
    async fn publish(&self, slot: SourceMode, vector: &FeatureVector, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let entry = CacheEntry {
            fields: vector.to_fields(),
            expires_at: now + ttl,
        };

        let write = |entries: &mut HashMap<String, CacheEntry>| {
            entries.retain(|_, e| e.expires_at > now);
            entries.insert(slot.cache_key().to_string(), entry);
        };

        match self.entries.write() {
            Ok(mut guard) => write(&mut *guard),
            Err(poisoned) => {
                tracing::error!("InMemoryFeatureCache: Lock poisoned during write, recovering");
                write(&mut *poisoned.into_inner());
            }
        }
        Ok(())
    }

    async fn read(&self, slot: SourceMode) -> Result<Option<FeatureVector>> {
        match self.fields(slot) {
            Some(fields) => Ok(Some(FeatureVector::from_fields(&fields)?)),
            None => Ok(None),
        }
    }
}
