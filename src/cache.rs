//! In-process result cache.
//!
//! Memoizes registry builds by snapshot fingerprint and per-file parses by
//! file fingerprint. Each key owns a `OnceCell`: concurrent callers for the
//! same key wait for the first computation instead of seeing a partial entry,
//! and a failed computation leaves the cell empty so the next caller retries.
//! Entries live as long as the cache unless [`ResultCache::clear`] is called.

use crate::error::Result;
use crate::fingerprint::{FileFingerprint, SnapshotFingerprint};
use crate::models::{ParsedStation, RegistryBuild};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::debug;

/// Hit/miss counters for one keyed memo table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
}

/// Keyed memo table with single-flight initialization
struct Memo<K, V> {
    cells: Mutex<HashMap<K, Arc<OnceCell<Arc<V>>>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<K: Eq + Hash + Clone, V> Memo<K, V> {
    fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    fn cell(&self, key: &K) -> Arc<OnceCell<Arc<V>>> {
        let mut cells = self.cells.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cells.entry(key.clone()).or_default().clone()
    }

    async fn get_or_try_init<F, Fut>(&self, key: &K, compute: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let cell = self.cell(key);
        if let Some(value) = cell.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(value));
        }

        let misses = &self.misses;
        let value = cell
            .get_or_try_init(|| async move {
                misses.fetch_add(1, Ordering::Relaxed);
                compute().await.map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(value))
    }

    fn peek(&self, key: &K) -> Option<Arc<V>> {
        let cells = self.cells.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cells.get(key).and_then(|cell| cell.get().cloned())
    }

    fn clear(&self) {
        self.cells
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn stats(&self) -> CacheStats {
        let cells = self.cells.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        CacheStats {
            entries: cells.values().filter(|cell| cell.initialized()).count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache shared by the station catalog and its callers
pub struct ResultCache {
    registries: Memo<SnapshotFingerprint, RegistryBuild>,
    stations: Memo<FileFingerprint, ParsedStation>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("registries", &self.registries.stats())
            .field("stations", &self.stations.stats())
            .finish()
    }
}

impl ResultCache {
    pub fn new() -> Self {
        Self {
            registries: Memo::new(),
            stations: Memo::new(),
        }
    }

    /// Registry for `snapshot`, building it with `build` on first request
    pub async fn registry<F, Fut>(
        &self,
        snapshot: &SnapshotFingerprint,
        build: F,
    ) -> Result<Arc<RegistryBuild>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RegistryBuild>>,
    {
        let result = self.registries.get_or_try_init(snapshot, build).await;
        debug!("Registry cache lookup for snapshot {}", snapshot.short());
        result
    }

    /// Parsed content for `fingerprint`, parsing with `parse` on first request
    pub async fn station<F, Fut>(
        &self,
        fingerprint: &FileFingerprint,
        parse: F,
    ) -> Result<Arc<ParsedStation>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ParsedStation>>,
    {
        self.stations.get_or_try_init(fingerprint, parse).await
    }

    /// Cached registry without computing anything
    pub fn cached_registry(&self, snapshot: &SnapshotFingerprint) -> Option<Arc<RegistryBuild>> {
        self.registries.peek(snapshot)
    }

    /// Cached parse without computing anything
    pub fn cached_station(&self, fingerprint: &FileFingerprint) -> Option<Arc<ParsedStation>> {
        self.stations.peek(fingerprint)
    }

    pub fn registry_stats(&self) -> CacheStats {
        self.registries.stats()
    }

    pub fn station_stats(&self) -> CacheStats {
        self.stations.stats()
    }

    /// Drop every entry; counters are kept
    pub fn clear(&self) {
        self.registries.clear();
        self.stations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StationError;
    use crate::fingerprint::snapshot_fingerprint;
    use crate::models::{ParseReport, RemoteFileRecord, StationMetadata, TimeSeries};
    use std::sync::atomic::AtomicUsize;

    fn fingerprint(tag: &str) -> FileFingerprint {
        RemoteFileRecord {
            name: "A.txt".to_string(),
            address: "https://h/A.txt".to_string(),
            change_tag: tag.to_string(),
            modified_at: String::new(),
            size_bytes: 1,
        }
        .fingerprint()
    }

    fn parsed(station: &str) -> ParsedStation {
        let mut metadata = StationMetadata::new();
        metadata.insert("station", station);
        ParsedStation {
            metadata,
            series: TimeSeries::default(),
            report: ParseReport::default(),
        }
    }

    #[tokio::test]
    async fn test_station_parse_memoized_by_fingerprint() {
        let cache = ResultCache::new();
        let calls = AtomicUsize::new(0);
        let key = fingerprint("1");

        for _ in 0..3 {
            let result = cache
                .station(&key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(parsed("A"))
                })
                .await
                .unwrap();
            assert_eq!(result.metadata.station(), Some("A"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            cache.station_stats(),
            CacheStats {
                entries: 1,
                hits: 2,
                misses: 1
            }
        );
    }

    #[tokio::test]
    async fn test_new_fingerprint_recomputes() {
        let cache = ResultCache::new();
        cache.station(&fingerprint("1"), || async { Ok(parsed("A")) }).await.unwrap();
        let fresh = cache
            .station(&fingerprint("2"), || async { Ok(parsed("B")) })
            .await
            .unwrap();

        assert_eq!(fresh.metadata.station(), Some("B"));
        assert_eq!(cache.station_stats().entries, 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = ResultCache::new();
        let key = fingerprint("1");

        let first = cache
            .station(&key, || async {
                Err(StationError::RemoteRead {
                    name: "A.txt".to_string(),
                    reason: "timeout".to_string(),
                })
            })
            .await;
        assert!(first.is_err());
        assert!(cache.cached_station(&key).is_none());

        let second = cache.station(&key, || async { Ok(parsed("A")) }).await;
        assert!(second.is_ok());
        assert!(cache.cached_station(&key).is_some());
    }

    #[tokio::test]
    async fn test_concurrent_requests_compute_once() {
        let cache = Arc::new(ResultCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let key = fingerprint("1");

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let key = key.clone();
                tokio::spawn(async move {
                    cache
                        .station(&key, || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                            Ok(parsed("A"))
                        })
                        .await
                        .map(|p| p.metadata.station().map(str::to_string))
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), Some("A".to_string()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_registry_memoized_and_cleared() {
        let cache = ResultCache::new();
        let snapshot = snapshot_fingerprint(&[]);

        let built = cache
            .registry(&snapshot, || async { Ok(RegistryBuild::empty(snapshot.clone())) })
            .await
            .unwrap();
        let again = cache
            .registry(&snapshot, || async {
                Err(StationError::Configuration {
                    message: "registry rebuilt".to_string(),
                })
            })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&built, &again));
        assert!(cache.cached_registry(&snapshot).is_some());

        cache.clear();
        assert!(cache.cached_registry(&snapshot).is_none());
        assert_eq!(cache.registry_stats().entries, 0);
    }
}
