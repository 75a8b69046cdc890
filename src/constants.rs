//! Application constants for station discovery
//!
//! File recognition rules, column-name preferences, metadata key lists and
//! default remote settings used throughout the pipeline.

// =============================================================================
// Remote Listing
// =============================================================================

/// Extension (lower-case) a remote entry must carry to be treated as a station file
pub const STATION_FILE_EXTENSION: &str = ".txt";

/// WebDAV depth header value for a recursive listing
pub const PROPFIND_DEPTH: &str = "infinity";

/// Body sent with the PROPFIND request, asking only for the properties we read
pub const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:displayname/>
    <d:getetag/>
    <d:getlastmodified/>
    <d:getcontentlength/>
  </d:prop>
</d:propfind>"#;

// =============================================================================
// Remote Defaults
// =============================================================================

pub const DEFAULT_BASE_URL: &str = "https://uni-bonn.sciebo.de/public.php/webdav/";
pub const DEFAULT_HOST_URL: &str = "https://uni-bonn.sciebo.de";
pub const DEFAULT_FOLDER: &str = "solutions/";

/// Per-request timeout applied to every listing and fetch
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Upper bound on concurrent file fetches when not configured
pub const MAX_DEFAULT_CONCURRENT_FETCHES: usize = 8;

// =============================================================================
// Environment Variables
// =============================================================================

pub mod env_vars {
    pub const BASE_URL: &str = "WEBDAV_BASE";
    pub const HOST_URL: &str = "WEBDAV_HOST";
    pub const FOLDER: &str = "WEBDAV_FOLDER";
    pub const USERNAME: &str = "WEBDAV_TOKEN";
    pub const PASSWORD: &str = "WEBDAV_PASS";
    pub const TIMEOUT_SECS: &str = "WEBDAV_TIMEOUT_SECS";
    pub const MAX_CONCURRENT: &str = "WEBDAV_MAX_CONCURRENT";
    /// Log filter directives; takes precedence over `RUST_LOG`
    pub const LOG: &str = "STATION_FEED_LOG";
}

// =============================================================================
// Station File Format
// =============================================================================

/// Metadata line pattern: `# key: value`
pub const METADATA_LINE_PATTERN: &str = r"^#\s*([^:]+)\s*:\s*(.*)$";

/// Comment prefix for header and in-body comment lines
pub const COMMENT_PREFIX: &str = "#";

/// Separators tried, in order, when sniffing the tabular body
pub const CANDIDATE_SEPARATORS: &[u8] = b",;\t|";

/// Number of body lines inspected when sniffing the separator
pub const SEPARATOR_SNIFF_LINES: usize = 20;

/// Canonical column names of a parsed series
pub const DATETIME_COLUMN: &str = "DateTime";
pub const VALUE_COLUMN: &str = "Value";

/// Timestamp column preferences; each is searched across all columns before the next
pub const DATETIME_COLUMN_PREFERENCES: &[&str] = &["datetime", "date_time", "date", "time"];

/// Substrings that mark a measured-value column
pub const VALUE_COLUMN_MARKERS: &[&str] = &["height", "water_level", "level", "value"];

// =============================================================================
// Metadata Keys
// =============================================================================

pub mod metadata_keys {
    pub const STATION: &str = "station";
    pub const FILE: &str = "file";

    /// Latitude lookup order
    pub const LATITUDE: &[&str] = &["latitude", "lat", "y", "northing"];

    /// Longitude lookup order; `longtitude` is a spelling seen in field data
    pub const LONGITUDE: &[&str] = &[
        "longitude",
        "lon",
        "long",
        "lng",
        "x",
        "easting",
        "longtitude",
    ];

    pub const UNITS: &[&str] = &["units", "unit"];
    pub const SENSOR: &[&str] = &["sensor_type", "sensor"];
    pub const VERTICAL_DATUM: &[&str] = &["vertical_datum", "datum"];
    pub const WATER_BODY: &str = "water_body";
    pub const LOCATION: &str = "location";
    pub const PROVIDER: &str = "provider";
}

/// Provider reported when a station file does not name one
pub const DEFAULT_PROVIDER: &str = "University of Bonn";

/// Default cap on points returned for a series preview
pub const DEFAULT_PREVIEW_POINTS: usize = 600;
