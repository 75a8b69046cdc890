//! Core data structures for station discovery.
//!
//! Defines remote listing records, station metadata, time series, the
//! station record handed to consumers, and the outcome of a registry build.

use crate::constants::{DEFAULT_PROVIDER, STATION_FILE_EXTENSION, metadata_keys};
use crate::fingerprint::{FileFingerprint, SnapshotFingerprint};
use crate::remote::FileHandle;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// One `.txt` entry of a remote directory listing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteFileRecord {
    /// Display name as reported by the listing
    pub name: String,
    /// Absolute URL the file can be fetched from
    pub address: String,
    /// ETag with quoting removed; empty when the server sends none
    pub change_tag: String,
    /// Raw `getlastmodified` value, format left as the server sent it
    pub modified_at: String,
    pub size_bytes: u64,
}

impl RemoteFileRecord {
    /// Cache key for this file's parsed content
    pub fn fingerprint(&self) -> FileFingerprint {
        FileFingerprint::of(self)
    }

    /// Display name without the station file extension
    pub fn stem(&self) -> &str {
        file_stem(&self.name)
    }
}

/// Strip a trailing station file extension (case-insensitive) from a name
pub fn file_stem(name: &str) -> &str {
    let ext_len = STATION_FILE_EXTENSION.len();
    if name.len() >= ext_len
        && name.is_char_boundary(name.len() - ext_len)
        && name[name.len() - ext_len..].eq_ignore_ascii_case(STATION_FILE_EXTENSION)
    {
        &name[..name.len() - ext_len]
    } else {
        name
    }
}

/// Station id implied by a file name: the stem up to its first underscore
pub fn station_id_from_name(name: &str) -> String {
    let stem = file_stem(name);
    stem.split('_').next().unwrap_or(stem).to_string()
}

/// Header metadata of a station file
///
/// Keys are lower-cased with spaces replaced by underscores; values are kept
/// verbatim (trimmed).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationMetadata(BTreeMap<String, String>);

impl StationMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// First non-empty value among `keys`, in order
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|key| self.get(key))
            .find(|value| !value.is_empty())
    }

    pub fn station(&self) -> Option<&str> {
        self.get(metadata_keys::STATION)
    }

    pub fn file(&self) -> Option<&str> {
        self.get(metadata_keys::FILE)
    }

    pub fn units(&self) -> Option<&str> {
        self.first_of(metadata_keys::UNITS)
    }

    pub fn sensor(&self) -> Option<&str> {
        self.first_of(metadata_keys::SENSOR)
    }

    pub fn vertical_datum(&self) -> Option<&str> {
        self.first_of(metadata_keys::VERTICAL_DATUM)
    }

    pub fn water_body(&self) -> Option<&str> {
        self.first_of(&[metadata_keys::WATER_BODY])
    }

    pub fn location(&self) -> Option<&str> {
        self.first_of(&[metadata_keys::LOCATION])
    }

    /// Operating provider, falling back to the default operator
    pub fn provider(&self) -> &str {
        self.first_of(&[metadata_keys::PROVIDER])
            .unwrap_or(DEFAULT_PROVIDER)
    }
}

/// A single timestamped measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(rename = "DateTime")]
    pub date_time: NaiveDateTime,
    /// NaN when the cell could not be read as a number
    #[serde(rename = "Value")]
    pub value: f64,
}

/// Observations sorted ascending by timestamp
///
/// Sorting is stable, so observations sharing a timestamp keep the order in
/// which they appeared in the source file. Duplicates are not removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSeries(Vec<Observation>);

impl TimeSeries {
    pub fn new(mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|obs| obs.date_time);
        Self(observations)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.0.iter()
    }

    pub fn values(&self) -> Vec<f64> {
        self.0.iter().map(|obs| obs.value).collect()
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.0.first().map(|obs| obs.date_time)
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.0.last().map(|obs| obs.date_time)
    }

    /// Observations whose calendar date lies in `[from, to]`
    ///
    /// Reversed bounds are swapped rather than producing an empty series.
    pub fn between(&self, from: NaiveDate, to: NaiveDate) -> TimeSeries {
        let (from, to) = if from > to { (to, from) } else { (from, to) };
        Self(
            self.0
                .iter()
                .filter(|obs| {
                    let day = obs.date_time.date();
                    day >= from && day <= to
                })
                .copied()
                .collect(),
        )
    }

    /// Every n-th observation so that roughly `max_points` remain
    ///
    /// Series already within the limit are returned unchanged.
    pub fn thinned(&self, max_points: usize) -> TimeSeries {
        if max_points == 0 || self.0.len() <= max_points {
            return self.clone();
        }
        let step = (self.0.len() / max_points).max(1);
        Self(self.0.iter().step_by(step).copied().collect())
    }

    /// Smallest and largest finite value
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.0
            .iter()
            .map(|obs| obs.value)
            .filter(|value| value.is_finite())
            .fold(None, |range, value| match range {
                None => Some((value, value)),
                Some((lo, hi)) => Some((lo.min(value), hi.max(value))),
            })
    }
}

/// Counters describing how tolerant parsing degraded a file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub missing_values: usize,
}

/// Full parse result of one station file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedStation {
    pub metadata: StationMetadata,
    pub series: TimeSeries,
    pub report: ParseReport,
}

/// Summary statistics kept in the registry in place of the full series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub count: usize,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub units: String,
}

impl SeriesSummary {
    pub fn from_parsed(parsed: &ParsedStation) -> Self {
        Self {
            count: parsed.series.len(),
            start: parsed.series.start(),
            end: parsed.series.end(),
            units: parsed.metadata.units().unwrap_or_default().to_string(),
        }
    }
}

/// A discovered station as exposed to consumers
#[derive(Debug, Clone, Serialize)]
pub struct Station {
    pub id: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub metadata: StationMetadata,
    pub summary: SeriesSummary,
    /// Handle used to re-fetch the raw file when the full series is requested
    #[serde(skip)]
    pub handle: Arc<dyn FileHandle>,
    pub fingerprint: FileFingerprint,
}

impl Station {
    pub fn has_coordinates(&self) -> bool {
        self.lat.is_some() && self.lon.is_some()
    }
}

/// A non-fatal problem recorded while building the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildWarning {
    /// The file could not be fetched or parsed and contributes no station
    Skipped { file: String, reason: String },
    /// A later file declared the same station id and replaced an earlier one
    StationOverridden {
        station_id: String,
        replaced_file: String,
        file: String,
    },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildWarning::Skipped { file, reason } => write!(f, "Skipped {}: {}", file, reason),
            BuildWarning::StationOverridden {
                station_id,
                replaced_file,
                file,
            } => write!(
                f,
                "Station {} from {} replaced by {}",
                station_id, replaced_file, file
            ),
        }
    }
}

/// Outcome of one registry build
#[derive(Debug, Clone, Serialize)]
pub struct RegistryBuild {
    pub snapshot: SnapshotFingerprint,
    pub stations: BTreeMap<String, Station>,
    pub warnings: Vec<BuildWarning>,
    pub files_listed: usize,
}

impl RegistryBuild {
    /// Registry with no stations, used when the remote folder cannot be listed
    pub fn empty(snapshot: SnapshotFingerprint) -> Self {
        Self {
            snapshot,
            stations: BTreeMap::new(),
            warnings: Vec::new(),
            files_listed: 0,
        }
    }

    pub fn station(&self, id: &str) -> Option<&Station> {
        self.stations.get(id)
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Number of listed files that contributed no station
    pub fn skipped_count(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, BuildWarning::Skipped { .. }))
            .count()
    }
}
