//! Access to the remote station share.
//!
//! [`RemoteSource`] lists station files and hands out [`FileHandle`]s; the
//! WebDAV implementation lives in [`webdav`], the listing document parser in
//! [`propfind`]. The registry builder only sees the traits, so tests swap in
//! an in-memory source.

pub mod propfind;
pub mod webdav;

pub use webdav::{RemoteTextFile, WebDavClient};

use crate::error::Result;
use crate::models::RemoteFileRecord;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// One remote file that can be fetched again on demand
#[async_trait]
pub trait FileHandle: fmt::Debug + Send + Sync {
    /// Unique location of the file (its absolute address)
    fn identity(&self) -> &str;

    /// Name shown to users and used to derive station ids
    fn display_name(&self) -> &str;

    /// Full text content; undecodable bytes are replaced, never rejected
    async fn fetch_text(&self) -> Result<String>;
}

/// A folder of station files
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Station files currently in the folder, sorted by `(lower-cased name, address)`
    ///
    /// Fails with `RemoteUnavailable` when the folder cannot be listed.
    async fn list(&self) -> Result<Vec<RemoteFileRecord>>;

    /// Handle for fetching the content of `record`
    fn open(&self, record: &RemoteFileRecord) -> Arc<dyn FileHandle>;

    /// Human-readable location for log lines
    fn location(&self) -> String;
}

/// Order a listing deterministically, independent of server response order
pub fn sort_listing(records: &mut [RemoteFileRecord]) {
    records.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.address.cmp(&b.address))
    });
}

/// True when `name` carries the station file extension, ignoring case
pub fn is_station_file(name: &str) -> bool {
    name.to_lowercase()
        .ends_with(crate::constants::STATION_FILE_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, address: &str) -> RemoteFileRecord {
        RemoteFileRecord {
            name: name.to_string(),
            address: address.to_string(),
            change_tag: String::new(),
            modified_at: String::new(),
            size_bytes: 0,
        }
    }

    #[test]
    fn test_sort_listing_case_insensitive_then_address() {
        let mut records = vec![
            record("b.txt", "https://h/2"),
            record("A.txt", "https://h/9"),
            record("a.txt", "https://h/1"),
        ];
        sort_listing(&mut records);

        let order: Vec<&str> = records.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(order, vec!["https://h/1", "https://h/9", "https://h/2"]);
    }

    #[test]
    fn test_is_station_file() {
        assert!(is_station_file("gauge.txt"));
        assert!(is_station_file("GAUGE.TXT"));
        assert!(!is_station_file("gauge.csv"));
        assert!(!is_station_file("txt"));
    }
}
