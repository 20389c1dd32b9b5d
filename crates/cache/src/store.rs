use async_trait::async_trait;

use crate::entry::CacheEntry;
use crate::error::StoreError;

/// Pluggable persistence backend.
///
/// Backends hold bytes; the singleflight and invalidation contracts live in
/// [`crate::ExecutionCache`] and hold regardless of the backend chosen.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch an entry, expired or not. Backends that find a corrupt entry
    /// discard it and report a miss; corruption is never propagated.
    async fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>, StoreError>;

    /// Insert or replace the entry for its fingerprint.
    async fn put(&self, entry: CacheEntry) -> Result<(), StoreError>;

    /// Remove every entry matching the predicate, returning how many went.
    async fn evict(
        &self,
        predicate: &(dyn for<'a> Fn(&'a CacheEntry) -> bool + Send + Sync),
    ) -> Result<usize, StoreError>;
}
