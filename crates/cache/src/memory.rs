use std::num::NonZeroUsize;
use std::sync::Mutex;

use async_trait::async_trait;
use lru::LruCache;

use crate::entry::CacheEntry;
use crate::error::StoreError;
use crate::store::CacheStore;

/// Bounded in-memory backend.
pub struct MemoryStore {
    entries: Mutex<LruCache<String, CacheEntry>>,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>, StoreError> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        Ok(entries.get(fingerprint).cloned())
    }

    async fn put(&self, entry: CacheEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.put(entry.fingerprint.clone(), entry);
        Ok(())
    }

    async fn evict(
        &self,
        predicate: &(dyn for<'a> Fn(&'a CacheEntry) -> bool + Send + Sync),
    ) -> Result<usize, StoreError> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| predicate(entry))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        Ok(doomed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runsight_protocol::{AnalysisResult, Intent, QueryFilters, StructuredQuery};

    fn entry(fingerprint: &str) -> CacheEntry {
        CacheEntry {
            fingerprint: fingerprint.to_owned(),
            result: AnalysisResult::default(),
            created_ms: 0,
            ttl_ms: 60_000,
            source_query: StructuredQuery::new(Intent::RawCount, QueryFilters::default()),
        }
    }

    #[tokio::test]
    async fn lru_capacity_bounds_the_store() {
        let store = MemoryStore::new(2);
        store.put(entry("a")).await.unwrap();
        store.put(entry("b")).await.unwrap();
        store.put(entry("c")).await.unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.get("a").await.unwrap().is_none());
        assert!(store.get("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn evict_by_predicate() {
        let store = MemoryStore::new(8);
        store.put(entry("a")).await.unwrap();
        store.put(entry("b")).await.unwrap();
        let gone = store.evict(&|e| e.fingerprint == "a").await.unwrap();
        assert_eq!(gone, 1);
        assert!(store.get("a").await.unwrap().is_none());
        assert!(store.get("b").await.unwrap().is_some());
    }
}
