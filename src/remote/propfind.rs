//! WebDAV multistatus parsing
//!
//! Reads the body of a `PROPFIND` response into [`RemoteFileRecord`]s.
//! Element prefixes are ignored (`d:href`, `D:href` and `href` are the same),
//! and a document that is not well-formed or has no `multistatus` root is
//! rejected as a whole.

use super::{is_station_file, sort_listing};
use crate::extract::parse_size;
use crate::models::RemoteFileRecord;
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::Url;
use tracing::debug;

/// Properties of one `<response>` element before filtering
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PropfindEntry {
    pub href: String,
    pub display_name: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub content_length: Option<String>,
    /// Whether the response carried a `propstat/prop` block at all
    pub has_props: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Href,
    DisplayName,
    Etag,
    LastModified,
    ContentLength,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"href" => Some(Field::Href),
            b"displayname" => Some(Field::DisplayName),
            b"getetag" => Some(Field::Etag),
            b"getlastmodified" => Some(Field::LastModified),
            b"getcontentlength" => Some(Field::ContentLength),
            _ => None,
        }
    }
}

/// Parse a multistatus document into raw entries, in document order
pub fn parse_multistatus(xml: &str) -> Result<Vec<PropfindEntry>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<PropfindEntry> = None;
    let mut field: Option<Field> = None;
    let mut in_prop = false;
    let mut depth = 0usize;
    let mut saw_multistatus = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                match e.local_name().as_ref() {
                    b"multistatus" => saw_multistatus = true,
                    b"response" => current = Some(PropfindEntry::default()),
                    b"prop" => {
                        in_prop = true;
                        if let Some(entry) = current.as_mut() {
                            entry.has_props = true;
                        }
                    }
                    name => {
                        field = Field::from_local_name(name)
                            .filter(|f| *f == Field::Href || in_prop);
                        if field == Some(Field::DisplayName) {
                            mark_display_name(current.as_mut());
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"prop" => {
                    if let Some(entry) = current.as_mut() {
                        entry.has_props = true;
                    }
                }
                b"displayname" if in_prop => mark_display_name(current.as_mut()),
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if let (Some(f), Some(entry)) = (field, current.as_mut()) {
                    let text = t.unescape().map_err(|e| {
                        format!("invalid text at position {}: {}", reader.buffer_position(), e)
                    })?;
                    store(entry, f, &text);
                }
            }
            Ok(Event::CData(t)) => {
                if let (Some(f), Some(entry)) = (field, current.as_mut()) {
                    let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                    store(entry, f, &text);
                }
            }
            Ok(Event::End(e)) => {
                depth = depth.saturating_sub(1);
                match e.local_name().as_ref() {
                    b"response" => {
                        if let Some(entry) = current.take() {
                            entries.push(entry);
                        }
                    }
                    b"prop" => in_prop = false,
                    _ => {}
                }
                field = None;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "XML parsing error at position {}: {}",
                    reader.buffer_position(),
                    e
                ));
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err("document ended inside an open element".to_string());
    }
    if !saw_multistatus {
        return Err("response is not a WebDAV multistatus document".to_string());
    }

    Ok(entries)
}

/// A `displayname` element was seen, even if it turns out to be empty
fn mark_display_name(entry: Option<&mut PropfindEntry>) {
    if let Some(entry) = entry {
        entry.display_name.get_or_insert_with(String::new);
    }
}

/// First non-empty occurrence of a property wins
fn store(entry: &mut PropfindEntry, field: Field, text: &str) {
    let slot = match field {
        Field::Href => {
            if entry.href.is_empty() {
                entry.href = text.trim().to_string();
            }
            return;
        }
        Field::DisplayName => &mut entry.display_name,
        Field::Etag => &mut entry.etag,
        Field::LastModified => &mut entry.last_modified,
        Field::ContentLength => &mut entry.content_length,
    };
    if slot.as_deref().is_none_or(str::is_empty) {
        *slot = Some(text.to_string());
    }
}

/// Turn raw entries into sorted station file records
///
/// Entries are kept only when both the href and the display name end in the
/// station file extension. Hrefs are resolved against `host`.
pub fn station_records(entries: Vec<PropfindEntry>, host: &Url) -> Vec<RemoteFileRecord> {
    let mut records: Vec<RemoteFileRecord> = entries
        .into_iter()
        .filter_map(|entry| to_record(entry, host))
        .collect();
    sort_listing(&mut records);
    records
}

fn to_record(entry: PropfindEntry, host: &Url) -> Option<RemoteFileRecord> {
    if entry.href.is_empty() || !is_station_file(&entry.href) || !entry.has_props {
        return None;
    }

    // An empty display name is kept empty and fails the extension check below
    let name = match entry.display_name {
        Some(name) => name.trim().to_string(),
        None => last_segment(&entry.href).to_string(),
    };
    if !is_station_file(&name) {
        debug!("Skipping {}: display name '{}' is not a station file", entry.href, name);
        return None;
    }

    let address = match host.join(&entry.href) {
        Ok(url) => url.to_string(),
        Err(e) => {
            debug!("Skipping {}: cannot resolve against host: {}", entry.href, e);
            return None;
        }
    };

    Some(RemoteFileRecord {
        name,
        address,
        change_tag: entry.etag.as_deref().map(strip_etag).unwrap_or_default(),
        modified_at: entry.last_modified.unwrap_or_default(),
        size_bytes: entry.content_length.as_deref().map(parse_size).unwrap_or(0),
    })
}

fn last_segment(href: &str) -> &str {
    href.trim_end_matches('/').rsplit('/').next().unwrap_or(href)
}

/// `"abc"` and `W/"abc"` both become `abc`
fn strip_etag(raw: &str) -> String {
    let tag = raw.trim();
    let tag = tag.strip_prefix("W/").unwrap_or(tag);
    tag.trim_matches('"').to_string()
}
