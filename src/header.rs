//! Station file header parsing and metadata extraction.
//!
//! Reads the leading `# key: value` comment block of a station file into
//! [`StationMetadata`] and locates the first line of the tabular body.

use crate::constants::{COMMENT_PREFIX, METADATA_LINE_PATTERN, metadata_keys};
use crate::models::{StationMetadata, station_id_from_name};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static METADATA_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(METADATA_LINE_PATTERN).expect("metadata line pattern is valid"));

/// Metadata plus the index of the first body line
#[derive(Debug, Clone, PartialEq)]
pub struct StationHeader {
    pub metadata: StationMetadata,
    pub body_start: usize,
}

/// Extract metadata from the comment header of `lines`
///
/// The scan stops at the first line that does not start with `#`. A missing
/// `station` key is derived from `identity`, and `file` is always set to it.
pub fn parse_station_header(lines: &[&str], identity: &str) -> StationHeader {
    let mut builder = StationHeaderBuilder::new();
    let mut body_start = lines.len();

    for (line_num, line) in lines.iter().enumerate() {
        if !line.starts_with(COMMENT_PREFIX) {
            body_start = line_num;
            break;
        }
        builder.parse_line(line);
    }

    let header = builder.build(identity, body_start);

    debug!(
        "Parsed header for {}: {} metadata keys, body_start={}",
        identity,
        header.metadata.len(),
        header.body_start
    );

    header
}

/// Lower-case a key and replace spaces with underscores
pub fn clean_key(key: &str) -> String {
    key.trim().to_lowercase().replace(' ', "_")
}

/// Builder for station metadata extraction
struct StationHeaderBuilder {
    metadata: StationMetadata,
}

impl StationHeaderBuilder {
    fn new() -> Self {
        Self {
            metadata: StationMetadata::new(),
        }
    }

    fn parse_line(&mut self, line: &str) {
        // Comment lines that are not `key: value` pairs carry no metadata
        if let Some(caps) = METADATA_LINE.captures(line) {
            let key = clean_key(&caps[1]);
            let value = caps[2].trim();
            self.metadata.insert(key, value);
        }
    }

    fn build(mut self, identity: &str, body_start: usize) -> StationHeader {
        if !self.metadata.contains_key(metadata_keys::STATION) {
            self.metadata
                .insert(metadata_keys::STATION, station_id_from_name(identity));
        }
        self.metadata.insert(metadata_keys::FILE, identity);

        StationHeader {
            metadata: self.metadata,
            body_start,
        }
    }
}
