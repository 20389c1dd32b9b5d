use std::path::{Path, PathBuf};

use async_trait::async_trait;
use runsight_protocol::InsightError;
use tokio::fs;

use crate::entry::CacheEntry;
use crate::error::StoreError;
use crate::store::CacheStore;

/// JSON-file backend, one file per fingerprint.
///
/// Writes go through a temp file and rename so a crash mid-write never
/// leaves a partially-written entry behind.
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn entry_path(&self, fingerprint: &str) -> PathBuf {
        self.dir.join(format!("{fingerprint}.json"))
    }

    async fn read_entry(&self, path: &Path) -> Option<CacheEntry> {
        let bytes = fs::read(path).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(entry) => Some(entry),
            Err(err) => {
                let fingerprint = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .unwrap_or("unknown")
                    .to_owned();
                let corrupt = InsightError::CacheCorrupt { fingerprint };
                log::warn!("{corrupt} ({}): {err}", path.display());
                let _ = fs::remove_file(path).await;
                None
            }
        }
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    async fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.read_entry(&self.entry_path(fingerprint)).await)
    }

    async fn put(&self, entry: CacheEntry) -> Result<(), StoreError> {
        let path = self.entry_path(&entry.fingerprint);
        let bytes = serde_json::to_vec(&entry)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).await?;
        if fs::rename(&tmp, &path).await.is_err() {
            let _ = fs::remove_file(&tmp).await;
        }
        Ok(())
    }

    async fn evict(
        &self,
        predicate: &(dyn for<'a> Fn(&'a CacheEntry) -> bool + Send + Sync),
    ) -> Result<usize, StoreError> {
        let mut removed = 0usize;
        let mut dir = fs::read_dir(&self.dir).await?;
        while let Some(dirent) = dir.next_entry().await? {
            let path = dirent.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(entry) = self.read_entry(&path).await {
                if predicate(&entry) {
                    let _ = fs::remove_file(&path).await;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runsight_protocol::{AnalysisResult, Intent, QueryFilters, StructuredQuery};
    use tempfile::tempdir;

    fn entry(fingerprint: &str) -> CacheEntry {
        CacheEntry {
            fingerprint: fingerprint.to_owned(),
            result: AnalysisResult::default(),
            created_ms: 1,
            ttl_ms: 60_000,
            source_query: StructuredQuery::new(Intent::RawCount, QueryFilters::default()),
        }
    }

    #[tokio::test]
    async fn round_trips_an_entry() {
        let dir = tempdir().unwrap();
        let store = DiskStore::new(dir.path()).unwrap();
        store.put(entry("abc")).await.unwrap();
        let got = store.get("abc").await.unwrap().unwrap();
        assert_eq!(got.fingerprint, "abc");
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_entries_are_discarded_not_propagated() {
        let dir = tempdir().unwrap();
        let store = DiskStore::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("bad.json"), b"{not json").unwrap();
        assert!(store.get("bad").await.unwrap().is_none());
        // The corrupt file is gone, so a recompute can land cleanly.
        assert!(!dir.path().join("bad.json").exists());
    }

    #[tokio::test]
    async fn evict_removes_matching_files() {
        let dir = tempdir().unwrap();
        let store = DiskStore::new(dir.path()).unwrap();
        store.put(entry("keep")).await.unwrap();
        store.put(entry("drop")).await.unwrap();
        let gone = store.evict(&|e| e.fingerprint == "drop").await.unwrap();
        assert_eq!(gone, 1);
        assert!(store.get("drop").await.unwrap().is_none());
        assert!(store.get("keep").await.unwrap().is_some());
    }
}
