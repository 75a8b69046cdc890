//! Tests for registry assembly against an in-memory remote source


use crate::error::{Result, StationError};
use crate::models::RemoteFileRecord;
use crate::remote::{FileHandle, RemoteSource, sort_listing};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const FAKE_ROOT: &str = "https://fake.example/dav/";

#[derive(Debug, Clone)]
struct FakeFile {
    record: RemoteFileRecord,
    /// `None` makes every fetch of this file fail
    content: Option<String>,
}

/// Remote folder held in memory, counting every file fetch
#[derive(Debug, Default)]
pub struct FakeSource {
    files: Mutex<Vec<FakeFile>>,
    fetches: Arc<AtomicUsize>,
    unavailable: AtomicBool,
    revision: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, name: &str, content: &str) -> Self {
        self.put(name, Some(content.to_string()));
        self
    }

    /// A listed file whose fetch always fails
    pub fn with_broken_file(self, name: &str) -> Self {
        self.put(name, None);
        self
    }

    /// A file with a fixed change tag instead of an insertion revision
    pub fn with_tagged_file(self, name: &str, content: &str, change_tag: &str) -> Self {
        self.insert(name, Some(content.to_string()), change_tag.to_string());
        self
    }

    /// Replace (or add) a file; the new version gets a fresh change tag
    pub fn put(&self, name: &str, content: Option<String>) {
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        self.insert(name, content, format!("rev-{}", revision));
    }

    fn insert(&self, name: &str, content: Option<String>, change_tag: String) {
        let record = RemoteFileRecord {
            name: name.to_string(),
            address: format!("{}{}", FAKE_ROOT, name),
            change_tag,
            modified_at: String::new(),
            size_bytes: content.as_ref().map_or(0, |c| c.len() as u64),
        };

        let mut files = self.files.lock().unwrap();
        files.retain(|file| file.record.name != name);
        files.push(FakeFile { record, content });
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSource for FakeSource {
    async fn list(&self) -> Result<Vec<RemoteFileRecord>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StationError::RemoteUnavailable {
                url: FAKE_ROOT.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        let mut records: Vec<RemoteFileRecord> = self
            .files
            .lock()
            .unwrap()
            .iter()
            .map(|file| file.record.clone())
            .collect();
        sort_listing(&mut records);
        Ok(records)
    }

    fn open(&self, record: &RemoteFileRecord) -> Arc<dyn FileHandle> {
        let content = self
            .files
            .lock()
            .unwrap()
            .iter()
            .find(|file| file.record.address == record.address)
            .and_then(|file| file.content.clone());
        Arc::new(FakeHandle {
            record: record.clone(),
            content,
            fetches: Arc::clone(&self.fetches),
        })
    }

    fn location(&self) -> String {
        FAKE_ROOT.to_string()
    }
}

#[derive(Debug)]
struct FakeHandle {
    record: RemoteFileRecord,
    content: Option<String>,
    fetches: Arc<AtomicUsize>,
}

#[async_trait]
impl FileHandle for FakeHandle {
    fn identity(&self) -> &str {
        &self.record.address
    }

    fn display_name(&self) -> &str {
        &self.record.name
    }

    async fn fetch_text(&self) -> Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.content.clone().ok_or_else(|| StationError::RemoteRead {
            name: self.record.name.clone(),
            reason: "404 Not Found".to_string(),
        })
    }
}

/// Minimal station file with one observation per value
pub fn gauge_file(station: Option<&str>, values: &[f64]) -> String {
    let mut text = String::new();
    if let Some(station) = station {
        text.push_str(&format!("# station: {}\n", station));
    }
    text.push_str("# unit: cm\nDateTime,Value\n");
    for (day, value) in values.iter().enumerate() {
        text.push_str(&format!("2024-03-{:02} 06:00,{}\n", day + 1, value));
    }
    text
}
