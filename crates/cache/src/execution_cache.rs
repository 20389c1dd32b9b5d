use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use runsight_protocol::{AnalysisResult, InsightError, NewDataEvent, StructuredQuery};

use crate::entry::CacheEntry;
use crate::store::CacheStore;
use crate::ttl::TtlPolicy;
use crate::unix_ms_now;

/// Memoizes analysis results by query fingerprint.
///
/// All mutation of the shared store flows through [`Self::get_or_compute`];
/// no component writes into the store directly.
pub struct ExecutionCache {
    store: Arc<dyn CacheStore>,
    ttl: TtlPolicy,
    /// Per-fingerprint computation gates. Holding a gate means "a
    /// computation for this fingerprint is in flight"; waiters queue on the
    /// gate and re-check the store instead of recomputing.
    inflight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ExecutionCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: TtlPolicy) -> Self {
        Self {
            store,
            ttl,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    fn gate_for(&self, fingerprint: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut inflight = self.inflight.lock().expect("inflight mutex poisoned");
        inflight
            .entry(fingerprint.to_owned())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn drop_gate(&self, fingerprint: &str) {
        let mut inflight = self.inflight.lock().expect("inflight mutex poisoned");
        inflight.remove(fingerprint);
    }

    async fn lookup_fresh(&self, fingerprint: &str) -> Option<Arc<AnalysisResult>> {
        match self.store.get(fingerprint).await {
            Ok(Some(entry)) if !entry.is_expired(unix_ms_now()) => Some(Arc::new(entry.result)),
            Ok(_) => None,
            Err(err) => {
                // Store trouble degrades to a miss, never to a caller error.
                log::warn!("Cache lookup failed for {fingerprint}: {err}");
                None
            }
        }
    }

    /// Return the cached result for `query`, computing it at most once
    /// across concurrent callers with the same fingerprint.
    ///
    /// On computation failure nothing is stored and the error propagates to
    /// the caller that ran the computation; queued waiters retry and will
    /// recompute if the store is still empty.
    pub async fn get_or_compute<F, Fut>(
        &self,
        query: &StructuredQuery,
        compute: F,
    ) -> Result<Arc<AnalysisResult>, InsightError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AnalysisResult, InsightError>>,
    {
        let fingerprint = query.fingerprint();

        if let Some(hit) = self.lookup_fresh(&fingerprint).await {
            log::debug!("Cache hit for {fingerprint}");
            return Ok(hit);
        }

        let gate = self.gate_for(&fingerprint);
        let _guard = gate.lock().await;

        // Re-check after winning the gate: a competing caller may have
        // finished the computation while this one queued.
        if let Some(hit) = self.lookup_fresh(&fingerprint).await {
            log::debug!("Singleflight follower hit for {fingerprint}");
            return Ok(hit);
        }

        log::debug!("Cache miss for {fingerprint}, computing");
        let result = match compute().await {
            Ok(result) => result,
            Err(err) => {
                self.drop_gate(&fingerprint);
                return Err(err);
            }
        };

        let entry = CacheEntry {
            fingerprint: fingerprint.clone(),
            result: result.clone(),
            created_ms: unix_ms_now(),
            ttl_ms: u64::try_from(self.ttl.ttl_for(query.intent).as_millis()).unwrap_or(u64::MAX),
            source_query: query.clone(),
        };
        if let Err(err) = self.store.put(entry).await {
            log::warn!("Cache store failed for {fingerprint}: {err}");
        }
        // The gate comes down only once the entry is visible in the store;
        // a caller arriving mid-write must queue, not start a second flight.
        self.drop_gate(&fingerprint);
        Ok(Arc::new(result))
    }

    /// Last-good result for `query` regardless of expiry, with its age.
    ///
    /// Used for degraded answers when the upstream is down; the caller
    /// annotates the response as stale.
    pub async fn lookup_stale(&self, query: &StructuredQuery) -> Option<(Arc<AnalysisResult>, u64)> {
        let fingerprint = query.fingerprint();
        match self.store.get(&fingerprint).await {
            Ok(Some(entry)) => {
                let age = entry.age_ms(unix_ms_now());
                Some((Arc::new(entry.result), age))
            }
            Ok(None) => None,
            Err(err) => {
                log::warn!("Stale lookup failed for {fingerprint}: {err}");
                None
            }
        }
    }

    /// Eagerly evict every entry whose filters overlap the event's
    /// project/time window, rather than waiting for TTL expiry.
    pub async fn invalidate(&self, event: &NewDataEvent) -> usize {
        match self.store.evict(&|entry| entry.overlaps(event)).await {
            Ok(count) => {
                if count > 0 {
                    log::info!(
                        "Invalidated {count} cache entries for project {}",
                        event.project
                    );
                }
                count
            }
            Err(err) => {
                log::warn!("Cache invalidation failed: {err}");
                0
            }
        }
    }
}
