mod disk;
mod entry;
mod error;
mod execution_cache;
mod memory;
mod store;
mod ttl;

pub use disk::DiskStore;
pub use entry::CacheEntry;
pub use error::StoreError;
pub use execution_cache::ExecutionCache;
pub use memory::MemoryStore;
pub use store::CacheStore;
pub use ttl::TtlPolicy;

pub(crate) fn unix_ms_now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
