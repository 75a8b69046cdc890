//! Command-line argument definitions for the station feed
//!
//! Remote settings can come from flags or from the same environment variables
//! [`RemoteConfig::from_env`] reads; flags win.

use crate::config::RemoteConfig;
use crate::constants::{DEFAULT_PREVIEW_POINTS, env_vars};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Discover water-level stations on a WebDAV share
#[derive(Debug, Clone, Parser)]
#[command(
    name = "station-feed",
    version,
    about = "Discover water-level stations on a WebDAV share and print their data",
    long_about = "Lists station text files on a WebDAV share, parses their `# key: value` \
                  headers and time series, and prints the resulting station registry or a \
                  single station's series. Results are cached by content fingerprint for the \
                  lifetime of the process."
)]
pub struct Args {
    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// List station files on the share and print the snapshot fingerprint
    List,
    /// Discover all stations and print the registry
    Stations {
        /// Print the registry as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the time series of one station
    Series(SeriesArgs),
}

#[derive(Debug, Clone, clap::Args)]
pub struct SeriesArgs {
    /// Station id as shown by `stations`
    #[arg(value_name = "STATION")]
    pub station: String,

    /// First calendar date to include (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub from: Option<NaiveDate>,

    /// Last calendar date to include (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub to: Option<NaiveDate>,

    /// Thin the series to at most roughly N points
    #[arg(long, value_name = "N")]
    pub max_points: Option<usize>,

    /// Thin the series to the default preview size
    #[arg(long, conflicts_with = "max_points")]
    pub preview: bool,

    /// Print observations as JSON
    #[arg(long)]
    pub json: bool,
}

impl SeriesArgs {
    /// Point limit requested on the command line, if any
    pub fn point_limit(&self) -> Option<usize> {
        if self.preview {
            Some(DEFAULT_PREVIEW_POINTS)
        } else {
            self.max_points
        }
    }

    /// Inclusive date range, open ends widened to the full calendar
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        if self.from.is_none() && self.to.is_none() {
            return None;
        }
        Some((
            self.from.unwrap_or(NaiveDate::MIN),
            self.to.unwrap_or(NaiveDate::MAX),
        ))
    }
}

/// Connection overrides for the WebDAV share
#[derive(Debug, Clone, clap::Args)]
pub struct RemoteArgs {
    /// WebDAV endpoint the folder is resolved against
    #[arg(long, global = true, value_name = "URL", env = env_vars::BASE_URL)]
    pub base_url: Option<String>,

    /// Scheme and host used to resolve listed hrefs
    #[arg(long, global = true, value_name = "URL", env = env_vars::HOST_URL)]
    pub host_url: Option<String>,

    /// Folder below the base URL holding station files
    #[arg(long, global = true, value_name = "PATH", env = env_vars::FOLDER)]
    pub folder: Option<String>,

    /// Share token or user name
    #[arg(long, global = true, value_name = "TOKEN", env = env_vars::USERNAME)]
    pub username: Option<String>,

    /// Password for basic auth
    #[arg(
        long,
        global = true,
        value_name = "PASSWORD",
        env = env_vars::PASSWORD,
        hide_env_values = true
    )]
    pub password: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, value_name = "SECS", env = env_vars::TIMEOUT_SECS)]
    pub timeout_secs: Option<u64>,

    /// Maximum number of files fetched at once
    #[arg(long, global = true, value_name = "N", env = env_vars::MAX_CONCURRENT)]
    pub max_concurrent: Option<usize>,
}

impl RemoteArgs {
    /// Apply flags on top of `config`
    pub fn apply(&self, mut config: RemoteConfig) -> RemoteConfig {
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url);
        }
        if let Some(host_url) = &self.host_url {
            config = config.with_host_url(host_url);
        }
        if let Some(folder) = &self.folder {
            config = config.with_folder(folder);
        }
        if self.username.is_some() || self.password.is_some() {
            let username = self.username.clone().unwrap_or(config.username.clone());
            let password = self.password.clone().unwrap_or(config.password.clone());
            config = config.with_credentials(username, password);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_request_timeout_secs(secs);
        }
        if let Some(max_fetches) = self.max_concurrent {
            config = config.with_max_concurrent_fetches(max_fetches);
        }
        config
    }
}

impl Args {
    /// Log level implied by `--verbose` / `--quiet`
    pub fn get_log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_series_command() {
        let args = Args::try_parse_from([
            "station-feed",
            "series",
            "BON",
            "--from",
            "2024-03-01",
            "--max-points",
            "100",
            "-v",
        ])
        .unwrap();

        assert_eq!(args.get_log_level(), "debug");
        match args.command {
            Commands::Series(series) => {
                assert_eq!(series.station, "BON");
                assert_eq!(series.point_limit(), Some(100));
                let (from, to) = series.date_range().unwrap();
                assert_eq!(from, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
                assert_eq!(to, NaiveDate::MAX);
            }
            other => panic!("Expected series command, got {:?}", other),
        }
    }

    #[test]
    fn test_preview_uses_default_points() {
        let args = Args::try_parse_from(["station-feed", "series", "X", "--preview"]).unwrap();
        match args.command {
            Commands::Series(series) => {
                assert_eq!(series.point_limit(), Some(DEFAULT_PREVIEW_POINTS));
                assert!(series.date_range().is_none());
            }
            other => panic!("Expected series command, got {:?}", other),
        }
    }

    #[test]
    fn test_quiet_and_verbose_conflict() {
        assert!(Args::try_parse_from(["station-feed", "-q", "-v", "list"]).is_err());
    }

    #[test]
    fn test_bad_date_rejected() {
        assert!(Args::try_parse_from(["station-feed", "series", "X", "--to", "31.12.2024"]).is_err());
    }

    #[test]
    fn test_remote_flags_override_config() {
        let args = Args::try_parse_from([
            "station-feed",
            "stations",
            "--json",
            "--base-url",
            "https://dav.example.org/webdav/",
            "--folder",
            "gauges/",
            "--max-concurrent",
            "3",
        ])
        .unwrap();

        let config = args.remote.apply(RemoteConfig::default());
        assert_eq!(
            config.listing_url().unwrap().as_str(),
            "https://dav.example.org/webdav/gauges/"
        );
        assert_eq!(config.max_concurrent_fetches, 3);
        assert!(matches!(args.command, Commands::Stations { json: true }));
    }
}
