//! Station Feed Library
//!
//! Discovers water-level station files on a WebDAV share and turns them into a
//! station registry with on-demand time series.
//!
//! This library provides tools for:
//! - Listing a remote folder over WebDAV and fingerprinting the listing
//! - Parsing `# key: value` headed station files with tolerant column inference
//! - Extracting coordinates from loosely formatted metadata
//! - Building a station registry that skips broken files instead of failing
//! - Caching registry builds and per-file parses by content fingerprint

pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod fingerprint;
pub mod header;
pub mod models;
pub mod parser;
pub mod registry;
pub mod remote;

pub use cache::ResultCache;
pub use config::RemoteConfig;
pub use error::{Result, StationError};
pub use fingerprint::{FileFingerprint, SnapshotFingerprint, snapshot_fingerprint};
pub use models::{
    BuildWarning, Observation, ParsedStation, RegistryBuild, RemoteFileRecord, Station,
    StationMetadata, TimeSeries,
};
pub use parser::parse_station;
pub use registry::StationCatalog;
pub use remote::{FileHandle, RemoteSource, WebDavClient};
