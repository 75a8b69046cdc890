//! Station registry assembly.
//!
//! [`StationCatalog`] ties a [`RemoteSource`] to a shared [`ResultCache`]:
//! it lists the remote folder, fingerprints the listing, and builds the
//! station registry from every listed file. Files are fetched and parsed on a
//! bounded pool; a file that cannot be fetched or parsed is skipped with a
//! warning and never fails the build.

#[cfg(test)]
pub mod tests;

use crate::cache::ResultCache;
use crate::config::RemoteConfig;
use crate::constants::MAX_DEFAULT_CONCURRENT_FETCHES;
use crate::error::{Result, StationError};
use crate::extract::{latitude, longitude};
use crate::fingerprint::{SnapshotFingerprint, snapshot_fingerprint};
use crate::models::{
    BuildWarning, ParsedStation, RegistryBuild, RemoteFileRecord, SeriesSummary, Station,
    TimeSeries, station_id_from_name,
};
use crate::parser::parse_station;
use crate::remote::{FileHandle, RemoteSource, WebDavClient};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task;
use tracing::{debug, error, info, warn};

/// Discovers stations on a remote source and memoizes the results
pub struct StationCatalog {
    source: Arc<dyn RemoteSource>,
    cache: Arc<ResultCache>,
    max_concurrent_fetches: usize,
}

impl std::fmt::Debug for StationCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StationCatalog")
            .field("source", &self.source.location())
            .field("cache", &self.cache)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .finish()
    }
}

impl StationCatalog {
    pub fn new(source: Arc<dyn RemoteSource>, cache: Arc<ResultCache>) -> Self {
        Self {
            source,
            cache,
            max_concurrent_fetches: num_cpus::get().clamp(1, MAX_DEFAULT_CONCURRENT_FETCHES),
        }
    }

    /// Catalog over the WebDAV share described by `config`
    pub fn from_config(config: &RemoteConfig, cache: Arc<ResultCache>) -> Result<Self> {
        let client = WebDavClient::new(config)?;
        Ok(Self::new(Arc::new(client), cache)
            .with_max_concurrent_fetches(config.max_concurrent_fetches))
    }

    /// Limit how many files are fetched and parsed at once (at least one)
    pub fn with_max_concurrent_fetches(mut self, max_fetches: usize) -> Self {
        self.max_concurrent_fetches = max_fetches.max(1);
        self
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn location(&self) -> String {
        self.source.location()
    }

    /// Current listing together with its fingerprint
    pub async fn snapshot(&self) -> Result<(Vec<RemoteFileRecord>, SnapshotFingerprint)> {
        let records = self.source.list().await?;
        let snapshot = snapshot_fingerprint(&records);
        debug!(
            "Snapshot {} covers {} files at {}",
            snapshot.short(),
            records.len(),
            self.source.location()
        );
        Ok((records, snapshot))
    }

    /// Registry for `snapshot`, built from a fresh listing on a cache miss
    pub async fn build(&self, snapshot: &SnapshotFingerprint) -> Result<Arc<RegistryBuild>> {
        self.cache
            .registry(snapshot, || async {
                let records = self.source.list().await?;
                let listed = snapshot_fingerprint(&records);
                if &listed != snapshot {
                    warn!(
                        "Listing changed while building: requested {}, found {}",
                        snapshot.short(),
                        listed.short()
                    );
                }
                Ok(self.assemble(records, snapshot.clone()).await)
            })
            .await
    }

    /// List the remote folder and return the registry for what is there now
    ///
    /// An unreachable folder yields an empty registry (not cached) so that
    /// callers can keep serving; other errors are returned.
    pub async fn discover(&self) -> Result<Arc<RegistryBuild>> {
        let (records, snapshot) = match self.snapshot().await {
            Ok(listing) => listing,
            Err(e @ StationError::RemoteUnavailable { .. }) => {
                warn!("{}; continuing with an empty registry", e);
                return Ok(Arc::new(RegistryBuild::empty(snapshot_fingerprint(&[]))));
            }
            Err(e) => return Err(e),
        };

        self.cache
            .registry(&snapshot, || async {
                Ok(self.assemble(records, snapshot.clone()).await)
            })
            .await
    }

    /// Full series of a registry station, re-using the cached parse when present
    pub async fn series_for(&self, station: &Station) -> Result<TimeSeries> {
        let parsed = self
            .cache
            .station(&station.fingerprint, || fetch_and_parse(Arc::clone(&station.handle)))
            .await?;
        Ok(parsed.series.clone())
    }

    /// Full series of the station with `id` in the current registry
    pub async fn series_for_id(&self, id: &str) -> Result<TimeSeries> {
        let registry = self.discover().await?;
        let station = registry
            .station(id)
            .ok_or_else(|| StationError::StationNotFound { id: id.to_string() })?;
        self.series_for(station).await
    }

    async fn assemble(
        &self,
        records: Vec<RemoteFileRecord>,
        snapshot: SnapshotFingerprint,
    ) -> RegistryBuild {
        let start_time = Instant::now();
        let files_listed = records.len();

        // `buffered` keeps listing order, so duplicate ids resolve by position
        let outcomes: Vec<_> = stream::iter(records)
            .map(|record| async move {
                let handle = self.source.open(&record);
                let fingerprint = record.fingerprint();
                let parsed = self
                    .cache
                    .station(&fingerprint, || fetch_and_parse(Arc::clone(&handle)))
                    .await;
                (record, handle, parsed)
            })
            .buffered(self.max_concurrent_fetches)
            .collect()
            .await;

        let mut registry = RegistryBuild {
            snapshot,
            stations: BTreeMap::new(),
            warnings: Vec::new(),
            files_listed,
        };

        for (record, handle, parsed) in outcomes {
            let parsed = match parsed {
                Ok(parsed) => parsed,
                Err(e) => {
                    if e.is_file_scoped() {
                        warn!("Skipping {}: {}", record.name, e);
                    } else {
                        error!("Skipping {} after unexpected error: {}", record.name, e);
                    }
                    registry.warnings.push(BuildWarning::Skipped {
                        file: record.name.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let station = to_station(&record, handle, &parsed);
            if let Some(previous) = registry.stations.get(&station.id) {
                let replaced_file = previous.metadata.file().unwrap_or_default().to_string();
                warn!(
                    "Station {} from {} replaced by {}",
                    station.id, replaced_file, record.name
                );
                registry.warnings.push(BuildWarning::StationOverridden {
                    station_id: station.id.clone(),
                    replaced_file,
                    file: record.name.clone(),
                });
            }
            registry.stations.insert(station.id.clone(), station);
        }

        info!(
            "Built registry {} with {} stations from {} files ({} skipped) in {:.2}s",
            registry.snapshot.short(),
            registry.station_count(),
            files_listed,
            registry.skipped_count(),
            start_time.elapsed().as_secs_f64()
        );
        registry
    }
}

/// Fetch one file and parse it off the async runtime
async fn fetch_and_parse(handle: Arc<dyn FileHandle>) -> Result<ParsedStation> {
    let text = handle.fetch_text().await?;
    let name = handle.display_name().to_string();
    debug!("Parsing {} ({} bytes)", name, text.len());

    task::spawn_blocking({
        let name = name.clone();
        move || parse_station(&text, &name)
    })
    .await
    .map_err(|e| StationError::InvalidFormat {
        source_name: name,
        reason: format!("parser task failed: {}", e),
    })?
}

fn to_station(
    record: &RemoteFileRecord,
    handle: Arc<dyn FileHandle>,
    parsed: &ParsedStation,
) -> Station {
    let id = parsed
        .metadata
        .station()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| station_id_from_name(&record.name));

    Station {
        id,
        lat: latitude(&parsed.metadata),
        lon: longitude(&parsed.metadata),
        metadata: parsed.metadata.clone(),
        summary: SeriesSummary::from_parsed(parsed),
        handle,
        fingerprint: record.fingerprint(),
    }
}
