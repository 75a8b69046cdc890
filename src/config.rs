//! Configuration for the remote station share.
//!
//! Connection settings are supplied externally (environment, `.env` file or
//! command-line flags); nothing about the share is hard-coded beyond the
//! public defaults in [`crate::constants`].

use crate::constants::{
    DEFAULT_BASE_URL, DEFAULT_FOLDER, DEFAULT_HOST_URL, DEFAULT_REQUEST_TIMEOUT_SECS,
    MAX_DEFAULT_CONCURRENT_FETCHES, env_vars,
};
use crate::error::{Result, StationError};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Connection and fetch settings for the WebDAV share
#[derive(Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// WebDAV endpoint the folder path is resolved against
    pub base_url: String,

    /// Scheme and host used to resolve the server-relative hrefs of a listing
    pub host_url: String,

    /// Folder below `base_url` holding the station files
    pub folder: String,

    /// Share token or user name for basic auth
    pub username: String,

    pub password: String,

    /// Timeout applied to every listing and fetch request
    pub request_timeout_secs: u64,

    /// Maximum number of files fetched and parsed at once
    pub max_concurrent_fetches: usize,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            host_url: DEFAULT_HOST_URL.to_string(),
            folder: DEFAULT_FOLDER.to_string(),
            username: String::new(),
            password: String::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_concurrent_fetches: num_cpus::get().clamp(1, MAX_DEFAULT_CONCURRENT_FETCHES),
        }
    }
}

// Credentials stay out of logs
impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url)
            .field("host_url", &self.host_url)
            .field("folder", &self.folder)
            .field("username", &redact(&self.username))
            .field("password", &redact(&self.password))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "<empty>" } else { "<redacted>" }
}

impl RemoteConfig {
    /// Read settings from the process environment, keeping defaults for unset keys
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, keeping defaults for keys it does not know
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = lookup(env_vars::BASE_URL) {
            config.base_url = value;
        }
        if let Some(value) = lookup(env_vars::HOST_URL) {
            config.host_url = value;
        }
        if let Some(value) = lookup(env_vars::FOLDER) {
            config.folder = value;
        }
        if let Some(value) = lookup(env_vars::USERNAME) {
            config.username = value;
        }
        if let Some(value) = lookup(env_vars::PASSWORD) {
            config.password = value;
        }
        if let Some(value) = lookup(env_vars::TIMEOUT_SECS) {
            config.request_timeout_secs = parse_number(env_vars::TIMEOUT_SECS, &value)?;
        }
        if let Some(value) = lookup(env_vars::MAX_CONCURRENT) {
            config.max_concurrent_fetches = parse_number(env_vars::MAX_CONCURRENT, &value)?;
        }

        debug!("Loaded remote configuration: {:?}", config);
        Ok(config)
    }

    /// Set the WebDAV base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the host URL used for resolving hrefs
    pub fn with_host_url(mut self, host_url: impl Into<String>) -> Self {
        self.host_url = host_url.into();
        self
    }

    /// Set the folder holding station files
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    /// Set basic-auth credentials
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the per-request timeout
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Set maximum concurrent fetches
    pub fn with_max_concurrent_fetches(mut self, max_fetches: usize) -> Self {
        self.max_concurrent_fetches = max_fetches;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// URL of the folder that gets listed
    pub fn listing_url(&self) -> Result<Url> {
        let base = parse_url("base_url", &self.base_url)?;
        base.join(&self.folder).map_err(|e| StationError::Configuration {
            message: format!("folder '{}' cannot be joined to base_url: {}", self.folder, e),
        })
    }

    pub fn host(&self) -> Result<Url> {
        parse_url("host_url", &self.host_url)
    }

    /// Check URLs and limits before any request is made
    pub fn validate(&self) -> Result<()> {
        self.listing_url()?;
        self.host()?;

        if self.request_timeout_secs == 0 {
            return Err(StationError::Configuration {
                message: "request_timeout_secs must be greater than 0".to_string(),
            });
        }
        if self.max_concurrent_fetches == 0 {
            return Err(StationError::Configuration {
                message: "max_concurrent_fetches must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_url(field: &str, value: &str) -> Result<Url> {
    if value.trim().is_empty() {
        return Err(StationError::Configuration {
            message: format!("{} is empty", field),
        });
    }
    Url::parse(value.trim()).map_err(|e| StationError::Configuration {
        message: format!("{} '{}' is not a valid URL: {}", field, value, e),
    })
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse::<T>().map_err(|_| StationError::Configuration {
        message: format!("{} must be a positive integer, got '{}'", key, value),
    })
}
