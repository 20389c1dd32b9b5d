use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use runsight_cache::{
    CacheEntry, CacheStore, DiskStore, ExecutionCache, MemoryStore, StoreError, TtlPolicy,
};
use runsight_protocol::{
    AnalysisResult, Intent, InsightError, NewDataEvent, QueryFilters, StructuredQuery, TimeRange,
};

/// Backend whose writes take a while to land, like a disk under pressure.
struct SlowPutStore {
    inner: MemoryStore,
    write_delay: Duration,
}

#[async_trait]
impl CacheStore for SlowPutStore {
    async fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>, StoreError> {
        self.inner.get(fingerprint).await
    }

    async fn put(&self, entry: CacheEntry) -> Result<(), StoreError> {
        tokio::time::sleep(self.write_delay).await;
        self.inner.put(entry).await
    }

    async fn evict(
        &self,
        predicate: &(dyn for<'a> Fn(&'a CacheEntry) -> bool + Send + Sync),
    ) -> Result<usize, StoreError> {
        self.inner.evict(predicate).await
    }
}

fn query(intent: Intent, platform: &str) -> StructuredQuery {
    StructuredQuery::new(
        intent,
        QueryFilters {
            platform: Some(platform.to_owned()),
            time_range: Some(TimeRange::days_back(7, Utc::now())),
            ..Default::default()
        },
    )
}

fn cache_with_memory() -> ExecutionCache {
    ExecutionCache::new(Arc::new(MemoryStore::new(32)), TtlPolicy::default())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_trigger_exactly_one_computation() {
    let cache = Arc::new(cache_with_memory());
    let computations = Arc::new(AtomicUsize::new(0));
    let q = query(Intent::FlakyDetection, "aws");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        let computations = Arc::clone(&computations);
        let q = q.clone();
        handles.push(tokio::spawn(async move {
            cache
                .get_or_compute(&q, || async {
                    computations.fetch_add(1, Ordering::SeqCst);
                    // Hold the flight open long enough for every caller to queue.
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(AnalysisResult::default())
                })
                .await
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    assert_eq!(computations.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn caller_arriving_during_a_slow_store_write_does_not_recompute() {
    let cache = Arc::new(ExecutionCache::new(
        Arc::new(SlowPutStore {
            inner: MemoryStore::new(32),
            write_delay: Duration::from_millis(150),
        }),
        TtlPolicy::default(),
    ));
    let computations = Arc::new(AtomicUsize::new(0));
    let q = query(Intent::FlakyDetection, "aws");

    let first = {
        let cache = Arc::clone(&cache);
        let computations = Arc::clone(&computations);
        let q = q.clone();
        tokio::spawn(async move {
            cache
                .get_or_compute(&q, || async {
                    computations.fetch_add(1, Ordering::SeqCst);
                    Ok(AnalysisResult::default())
                })
                .await
        })
    };

    // Land inside the write window: computed, not yet visible in the store.
    tokio::time::sleep(Duration::from_millis(50)).await;
    cache
        .get_or_compute(&q, || async {
            computations.fetch_add(1, Ordering::SeqCst);
            Ok(AnalysisResult::default())
        })
        .await
        .unwrap();

    assert!(first.await.unwrap().is_ok());
    assert_eq!(computations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn different_fingerprints_compute_independently() {
    let cache = cache_with_memory();
    let computations = AtomicUsize::new(0);

    for platform in ["aws", "gcp"] {
        let q = query(Intent::RawCount, platform);
        cache
            .get_or_compute(&q, || async {
                computations.fetch_add(1, Ordering::SeqCst);
                Ok(AnalysisResult::default())
            })
            .await
            .unwrap();
    }
    assert_eq!(computations.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_computation_caches_nothing() {
    let cache = cache_with_memory();
    let q = query(Intent::Trend, "aws");

    let err = cache
        .get_or_compute(&q, || async {
            Err(InsightError::UpstreamUnavailable {
                attempts: 3,
                reason: "down".to_owned(),
            })
        })
        .await;
    assert!(matches!(
        err,
        Err(InsightError::UpstreamUnavailable { attempts: 3, .. })
    ));

    // The failure left no partial entry behind; the next call recomputes.
    let recomputed = AtomicUsize::new(0);
    cache
        .get_or_compute(&q, || async {
            recomputed.fetch_add(1, Ordering::SeqCst);
            Ok(AnalysisResult::default())
        })
        .await
        .unwrap();
    assert_eq!(recomputed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn expired_entries_are_recomputed_but_available_stale() {
    let cache = ExecutionCache::new(
        Arc::new(MemoryStore::new(32)),
        TtlPolicy {
            flaky_detection: Duration::from_millis(20),
            ..Default::default()
        },
    );
    let q = query(Intent::FlakyDetection, "aws");
    let computations = AtomicUsize::new(0);

    let compute = || async {
        computations.fetch_add(1, Ordering::SeqCst);
        Ok(AnalysisResult::default())
    };
    cache.get_or_compute(&q, compute).await.unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;

    // Expired for normal reads, still reachable as last-good data.
    assert!(cache.lookup_stale(&q).await.is_some());
    cache
        .get_or_compute(&q, || async {
            computations.fetch_add(1, Ordering::SeqCst);
            Ok(AnalysisResult::default())
        })
        .await
        .unwrap();
    assert_eq!(computations.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn invalidation_evicts_overlapping_entries_only() {
    let cache = cache_with_memory();
    let now = Utc::now();

    let overlapping = StructuredQuery::new(
        Intent::RawCount,
        QueryFilters {
            project: Some("payments".to_owned()),
            time_range: Some(TimeRange::days_back(7, now)),
            ..Default::default()
        },
    );
    let other_project = StructuredQuery::new(
        Intent::RawCount,
        QueryFilters {
            project: Some("search".to_owned()),
            time_range: Some(TimeRange::days_back(7, now)),
            ..Default::default()
        },
    );
    let older_window = StructuredQuery::new(
        Intent::RawCount,
        QueryFilters {
            project: Some("payments".to_owned()),
            time_range: Some(TimeRange::days_back(7, now - chrono::Duration::days(30))),
            ..Default::default()
        },
    );

    let computations = AtomicUsize::new(0);
    for q in [&overlapping, &other_project, &older_window] {
        cache
            .get_or_compute(q, || async {
                computations.fetch_add(1, Ordering::SeqCst);
                Ok(AnalysisResult::default())
            })
            .await
            .unwrap();
    }

    let evicted = cache
        .invalidate(&NewDataEvent {
            project: "payments".to_owned(),
            window: TimeRange::days_back(1, now),
        })
        .await;
    assert_eq!(evicted, 1);

    // Only the overlapping entry is recomputed on the next lookup.
    for q in [&overlapping, &other_project, &older_window] {
        cache
            .get_or_compute(q, || async {
                computations.fetch_add(1, Ordering::SeqCst);
                Ok(AnalysisResult::default())
            })
            .await
            .unwrap();
    }
    assert_eq!(computations.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn disk_backend_honors_the_same_contracts() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ExecutionCache::new(
        Arc::new(DiskStore::new(dir.path()).unwrap()),
        TtlPolicy::default(),
    );
    let q = query(Intent::FailureAnalysis, "gcp");
    let computations = AtomicUsize::new(0);

    for _ in 0..2 {
        cache
            .get_or_compute(&q, || async {
                computations.fetch_add(1, Ordering::SeqCst);
                Ok(AnalysisResult::default())
            })
            .await
            .unwrap();
    }
    assert_eq!(computations.load(Ordering::SeqCst), 1);
}
