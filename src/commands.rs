//! Command implementations for the station feed CLI
//!
//! Each subcommand builds a [`StationCatalog`] from the layered remote
//! configuration (defaults, environment, flags) and prints its results to
//! stdout. Logs and progress go to stderr.

use crate::cache::ResultCache;
use crate::cli::{Args, Commands, SeriesArgs};
use crate::config::RemoteConfig;
use crate::constants::env_vars;
use crate::models::{BuildWarning, RegistryBuild, SeriesSummary, Station, TimeSeries};
use crate::registry::StationCatalog;
use anyhow::{Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Run the parsed command line
pub async fn run(args: Args) -> Result<()> {
    let output = setup_logging(&args)?;
    debug!("Command line arguments: {:?}", args);

    let config = load_configuration(&args)?;
    let catalog = StationCatalog::from_config(&config, Arc::new(ResultCache::new()))
        .context("Failed to set up the remote station catalog")?;
    info!("Using remote folder {}", catalog.location());

    match &args.command {
        Commands::List => run_list(&catalog).await,
        Commands::Stations { json } => run_stations(&catalog, *json, output.progress).await,
        Commands::Series(series) => run_series(&catalog, series).await,
    }
}

/// Console behaviour implied by `--verbose` / `--quiet`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMode {
    /// Filter used when no log filter is set in the environment
    pub default_filter: String,
    /// Uptime stamps on log lines, only worth the noise when debugging
    pub timestamps: bool,
    /// Spinner on stderr while the registry builds
    pub progress: bool,
}

impl OutputMode {
    pub fn from_args(args: &Args) -> Self {
        Self {
            default_filter: format!("{}={}", env!("CARGO_CRATE_NAME"), args.get_log_level()),
            timestamps: args.verbose,
            progress: !args.quiet,
        }
    }
}

/// Install the stderr log subscriber and return the console mode
pub fn setup_logging(args: &Args) -> Result<OutputMode> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let mode = OutputMode::from_args(args);
    let filter = [env_vars::LOG, EnvFilter::DEFAULT_ENV]
        .into_iter()
        .find_map(|var| EnvFilter::try_from_env(var).ok())
        .unwrap_or_else(|| EnvFilter::new(&mode.default_filter));

    let timed = mode.timestamps.then(|| {
        fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::uptime())
            .with_writer(std::io::stderr)
    });
    let plain = (!mode.timestamps).then(|| {
        fmt::layer()
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(timed)
        .with(plain)
        .try_init()
        .context("Failed to install log subscriber")?;

    debug!("Logging initialized with {:?}", mode);
    Ok(mode)
}

/// Defaults, then environment, then flags
fn load_configuration(args: &Args) -> Result<RemoteConfig> {
    let config = RemoteConfig::from_env().context("Invalid remote settings in environment")?;
    let config = args.remote.apply(config);
    config.validate().context("Invalid remote configuration")?;
    debug!("Loaded configuration: {:?}", config);
    Ok(config)
}

async fn run_list(catalog: &StationCatalog) -> Result<()> {
    let (records, snapshot) = catalog
        .snapshot()
        .await
        .context("Failed to list the remote folder")?;

    println!(
        "{} {} station files at {}",
        "Found".bright_green(),
        records.len().to_string().bright_white().bold(),
        catalog.location().bright_cyan()
    );
    for record in &records {
        println!(
            "  {:<40} {:>10}  {}",
            record.name,
            format_size(record.size_bytes),
            record.modified_at.bright_black()
        );
    }
    println!("\n{} {}", "Snapshot:".bright_cyan(), snapshot);
    Ok(())
}

async fn run_stations(catalog: &StationCatalog, json: bool, progress: bool) -> Result<()> {
    let start_time = Instant::now();
    let spinner = (progress && !json).then(|| spinner("Discovering stations...")).transpose()?;

    let registry = catalog.discover().await.context("Station discovery failed")?;

    if let Some(pb) = &spinner {
        pb.finish_and_clear();
    }

    if json {
        println!("{}", serde_json::to_string_pretty(registry.as_ref())?);
        return Ok(());
    }

    print_registry(&registry);
    println!(
        "\n{} in {:.1}s (snapshot {})",
        "Discovery complete".bright_green().bold(),
        start_time.elapsed().as_secs_f64(),
        registry.snapshot.short()
    );
    Ok(())
}

async fn run_series(catalog: &StationCatalog, args: &SeriesArgs) -> Result<()> {
    let mut series = catalog
        .series_for_id(&args.station)
        .await
        .with_context(|| format!("Failed to load series for station {}", args.station))?;

    if let Some((from, to)) = args.date_range() {
        series = series.between(from, to);
    }
    if let Some(max_points) = args.point_limit() {
        series = series.thinned(max_points);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&series)?);
        return Ok(());
    }

    print_series(&args.station, &series);
    Ok(())
}

fn spinner(message: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

fn print_registry(registry: &RegistryBuild) {
    println!(
        "{} {} stations from {} files",
        "Registry:".bright_green().bold(),
        registry.station_count().to_string().bright_white().bold(),
        registry.files_listed
    );
    println!();
    println!(
        "  {:<16} {:>10} {:>10}  {:<35} {:>8}  {}",
        "Station", "Lat", "Lon", "Coverage", "Points", "Units"
    );
    for station in registry.stations.values() {
        println!("  {}", station_row(station));
    }

    if !registry.warnings.is_empty() {
        println!("\n{}", "Warnings:".bright_yellow().bold());
        for warning in &registry.warnings {
            let line = warning.to_string();
            match warning {
                BuildWarning::Skipped { .. } => println!("  {}", line.bright_yellow()),
                BuildWarning::StationOverridden { .. } => println!("  {}", line.bright_black()),
            }
        }
    }
}

fn station_row(station: &Station) -> String {
    format!(
        "{:<16} {:>10} {:>10}  {:<35} {:>8}  {}",
        station.id,
        format_coordinate(station.lat),
        format_coordinate(station.lon),
        format_coverage(&station.summary),
        station.summary.count,
        station.summary.units
    )
}

fn print_series(station: &str, series: &TimeSeries) {
    println!(
        "{} {} ({} observations)",
        "Station".bright_green(),
        station.bright_white().bold(),
        series.len()
    );
    if let Some((lo, hi)) = series.value_range() {
        println!("  {} {} .. {}", "Range:".bright_cyan(), lo, hi);
    }
    for obs in series.iter() {
        println!("  {}  {}", obs.date_time.format("%Y-%m-%d %H:%M:%S"), obs.value);
    }
}

pub fn format_coordinate(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.5}", v))
}

pub fn format_coverage(summary: &SeriesSummary) -> String {
    match (summary.start, summary.end) {
        (Some(start), Some(end)) => format!(
            "{} .. {}",
            start.format("%Y-%m-%d %H:%M"),
            end.format("%Y-%m-%d %H:%M")
        ),
        _ => "no observations".to_string(),
    }
}

/// Format a byte count in human-readable form
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use clap::Parser;

    fn output_for(flags: &[&str]) -> OutputMode {
        let mut argv = vec!["station-feed"];
        argv.extend_from_slice(flags);
        argv.push("list");
        OutputMode::from_args(&Args::try_parse_from(argv).unwrap())
    }

    #[test]
    fn test_output_mode_from_flags() {
        let default = output_for(&[]);
        assert_eq!(default.default_filter, "station_feed=info");
        assert!(default.progress);
        assert!(!default.timestamps);

        let verbose = output_for(&["-v"]);
        assert_eq!(verbose.default_filter, "station_feed=debug");
        assert!(verbose.timestamps);
        assert!(verbose.progress);

        let quiet = output_for(&["--quiet"]);
        assert_eq!(quiet.default_filter, "station_feed=warn");
        assert!(!quiet.progress);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_format_coordinate() {
        assert_eq!(format_coordinate(Some(50.73)), "50.73000");
        assert_eq!(format_coordinate(None), "-");
    }

    #[test]
    fn test_format_coverage() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        let summary = SeriesSummary {
            count: 2,
            start: Some(start),
            end: Some(start + chrono::Duration::days(1)),
            units: "cm".to_string(),
        };
        assert_eq!(format_coverage(&summary), "2024-03-01 06:00 .. 2024-03-02 06:00");

        let empty = SeriesSummary {
            count: 0,
            start: None,
            end: None,
            units: String::new(),
        };
        assert_eq!(format_coverage(&empty), "no observations");
    }
}
