//! Station file parser
//!
//! Turns the raw text of a station file into [`ParsedStation`]: header
//! metadata plus a sorted `(DateTime, Value)` series.
//!
//! ## Architecture
//!
//! - [`crate::header`] - `# key: value` metadata block and body boundary
//! - [`delimiter`] - separator detection for the tabular body
//! - [`columns`] - timestamp/value column inference
//! - [`datetime`] - tolerant cell parsing
//!
//! The body itself is read with polars, with every column loaded as text so
//! that cell parsing stays in our hands. Rows whose timestamp cannot be read
//! are dropped and counted in [`ParseReport`]; unreadable values become NaN.

pub mod columns;
pub mod datetime;
pub mod delimiter;

#[cfg(test)]
pub mod tests;

pub use columns::ColumnSelection;
pub use delimiter::{Separator, sniff_separator};

use crate::constants::{COMMENT_PREFIX, DATETIME_COLUMN, VALUE_COLUMN};
use crate::error::{Result, StationError};
use crate::header::parse_station_header;
use crate::models::{Observation, ParseReport, ParsedStation, TimeSeries};
use polars::prelude::*;
use std::io::Cursor;
use tracing::debug;

/// Parse one station file
///
/// `identity` names the source (the remote display name); it seeds the
/// `station` key when the header has none and is stored under `file`.
pub fn parse_station(raw: &str, identity: &str) -> Result<ParsedStation> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let lines: Vec<&str> = raw.lines().collect();

    let header = parse_station_header(&lines, identity);

    let body: Vec<&str> = lines[header.body_start..]
        .iter()
        .copied()
        .filter(|line| !line.trim().is_empty() && !line.starts_with(COMMENT_PREFIX))
        .collect();

    let frame = read_body(&body, identity)?;

    let names: Vec<String> = frame
        .get_column_names()
        .iter()
        .map(|name| name.trim().to_string())
        .collect();
    let selection = ColumnSelection::infer(&names, identity)?;

    debug!(
        "Columns for {}: {} <- '{}', {} <- '{}'",
        identity,
        DATETIME_COLUMN,
        names[selection.datetime],
        VALUE_COLUMN,
        names[selection.value]
    );

    let columns = frame.get_columns();
    let timestamps = columns[selection.datetime].str()?;
    let values = columns[selection.value].str()?;

    let mut report = ParseReport {
        rows_read: frame.height(),
        ..Default::default()
    };
    let mut observations = Vec::with_capacity(frame.height());

    for (raw_time, raw_value) in timestamps.into_iter().zip(values.into_iter()) {
        let Some(date_time) = raw_time.and_then(datetime::parse_datetime) else {
            report.rows_dropped += 1;
            continue;
        };
        let value = match raw_value.and_then(datetime::parse_value) {
            Some(value) => value,
            None => {
                report.missing_values += 1;
                f64::NAN
            }
        };
        observations.push(Observation { date_time, value });
    }

    if report.rows_dropped > 0 {
        debug!(
            "Dropped {} of {} rows with unreadable timestamps in {}",
            report.rows_dropped, report.rows_read, identity
        );
    }

    Ok(ParsedStation {
        metadata: header.metadata,
        series: TimeSeries::new(observations),
        report,
    })
}

/// Read the comment-free body as an all-text frame
fn read_body(body: &[&str], identity: &str) -> Result<DataFrame> {
    if body.is_empty() {
        return Err(StationError::InvalidFormat {
            source_name: identity.to_string(),
            reason: "no column header line after metadata".to_string(),
        });
    }

    let separator = sniff_separator(body);
    let text = match separator {
        Separator::Char(_) => body.join("\n"),
        Separator::Whitespace => body
            .iter()
            .map(|line| delimiter::normalize_whitespace(line))
            .collect::<Vec<_>>()
            .join("\n"),
    };

    // Quoting is only enabled when some field opens with a quote
    let quote_char = delimiter::has_quoted_fields(text.lines(), separator.byte()).then_some(b'"');
    match read_frame(&text, separator, quote_char) {
        Ok(frame) => Ok(frame),
        Err(e) if quote_char.is_some() => {
            debug!("Quoted read of {} failed ({}); retrying without quotes", identity, e);
            Ok(read_frame(&text, separator, None)?)
        }
        Err(e) => Err(e.into()),
    }
}

fn read_frame(text: &str, separator: Separator, quote_char: Option<u8>) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| {
            opts.with_separator(separator.byte())
                .with_quote_char(quote_char)
                .with_truncate_ragged_lines(true)
        })
        .into_reader_with_file_handle(Cursor::new(text.as_bytes().to_vec()))
        .finish()
}
