//! WebDAV client for the station share
//!
//! Lists the configured folder with a recursive `PROPFIND` and fetches files
//! with authenticated `GET`s. A single `reqwest::Client` (and its connection
//! pool) is shared by the lister and every file handle.

use super::propfind::{parse_multistatus, station_records};
use super::{FileHandle, RemoteSource};
use crate::config::RemoteConfig;
use crate::constants::{PROPFIND_BODY, PROPFIND_DEPTH};
use crate::error::{Result, StationError};
use crate::models::RemoteFileRecord;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Url};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Authenticated client bound to one remote folder
#[derive(Clone)]
pub struct WebDavClient {
    client: Client,
    listing_url: Url,
    host: Url,
    username: String,
    password: String,
}

impl fmt::Debug for WebDavClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebDavClient")
            .field("listing_url", &self.listing_url.as_str())
            .field("host", &self.host.as_str())
            .finish_non_exhaustive()
    }
}

impl WebDavClient {
    /// Build a client from validated configuration
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| StationError::Configuration {
                message: format!("cannot build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            listing_url: config.listing_url()?,
            host: config.host()?,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn listing_url(&self) -> &Url {
        &self.listing_url
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        if self.username.is_empty() && self.password.is_empty() {
            builder
        } else {
            builder.basic_auth(&self.username, Some(&self.password))
        }
    }

    /// Recursive listing of station files under the configured folder
    pub async fn list_station_files(&self) -> Result<Vec<RemoteFileRecord>> {
        let unavailable = |reason: String| StationError::RemoteUnavailable {
            url: self.listing_url.to_string(),
            reason,
        };

        let method = Method::from_bytes(b"PROPFIND").map_err(|e| unavailable(e.to_string()))?;
        let request = self
            .client
            .request(method, self.listing_url.clone())
            .header("Depth", PROPFIND_DEPTH)
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/xml; charset=utf-8"),
            )
            .body(PROPFIND_BODY);

        debug!("PROPFIND {}", self.listing_url);
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| unavailable(e.to_string()))?;
        let body = response
            .text()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let entries = parse_multistatus(&body).map_err(unavailable)?;
        let total_entries = entries.len();
        let records = station_records(entries, &self.host);

        info!(
            "Listed {} station files ({} entries) under {}",
            records.len(),
            total_entries,
            self.listing_url
        );
        Ok(records)
    }

    /// Fetch one file as text, replacing invalid UTF-8
    pub async fn fetch_text(&self, record: &RemoteFileRecord) -> Result<String> {
        let read_error = |reason: String| StationError::RemoteRead {
            name: record.name.clone(),
            reason,
        };

        debug!("GET {}", record.address);
        let response = self
            .authorized(self.client.get(&record.address))
            .send()
            .await
            .map_err(|e| read_error(e.to_string()))?
            .error_for_status()
            .map_err(|e| read_error(e.to_string()))?;
        // Decodes with the charset from Content-Type, UTF-8 when absent
        response.text().await.map_err(|e| read_error(e.to_string()))
    }
}

#[async_trait]
impl RemoteSource for WebDavClient {
    async fn list(&self) -> Result<Vec<RemoteFileRecord>> {
        self.list_station_files().await
    }

    fn open(&self, record: &RemoteFileRecord) -> Arc<dyn FileHandle> {
        Arc::new(RemoteTextFile {
            record: record.clone(),
            client: self.clone(),
        })
    }

    fn location(&self) -> String {
        self.listing_url.to_string()
    }
}

/// Handle to one listed file on the share
#[derive(Debug, Clone)]
pub struct RemoteTextFile {
    record: RemoteFileRecord,
    client: WebDavClient,
}

impl RemoteTextFile {
    pub fn record(&self) -> &RemoteFileRecord {
        &self.record
    }
}

#[async_trait]
impl FileHandle for RemoteTextFile {
    fn identity(&self) -> &str {
        &self.record.address
    }

    fn display_name(&self) -> &str {
        &self.record.name
    }

    async fn fetch_text(&self) -> Result<String> {
        self.client.fetch_text(&self.record).await
    }
}
