//! Tolerant numeric extraction from free-text metadata values.
//!
//! Values such as `50,5`, `50.5 N` or `7.1° E` are reduced to the first
//! number they contain. Nothing here fails: unreadable input yields `None`.

use crate::constants::metadata_keys;
use crate::models::StationMetadata;
use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-+]?\d+(?:[.,]\d+)?").expect("number pattern is valid"));

/// Raw input to [`to_float`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Number(f64),
    Text(&'a str),
}

impl From<f64> for FieldValue<'_> {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue<'_> {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl<'a> From<&'a str> for FieldValue<'a> {
    fn from(value: &'a str) -> Self {
        FieldValue::Text(value)
    }
}

/// Read a float out of a number or the first numeric substring of a text
pub fn to_float<'a>(value: impl Into<FieldValue<'a>>) -> Option<f64> {
    match value.into() {
        FieldValue::Number(n) => Some(n),
        FieldValue::Text(text) => {
            let found = NUMBER.find(text)?;
            found.as_str().replace(',', ".").parse::<f64>().ok()
        }
    }
}

/// First key in `keys` whose value yields a number
///
/// Keys after the first successful one are not consulted.
pub fn first_float(metadata: &StationMetadata, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| metadata.get(key))
        .find_map(|value| to_float(value))
}

pub fn latitude(metadata: &StationMetadata) -> Option<f64> {
    first_float(metadata, metadata_keys::LATITUDE)
}

pub fn longitude(metadata: &StationMetadata) -> Option<f64> {
    first_float(metadata, metadata_keys::LONGITUDE)
}

/// Content length as reported by a listing; anything unreadable counts as 0
pub fn parse_size(raw: &str) -> u64 {
    raw.trim().parse::<u64>().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(pairs: &[(&str, &str)]) -> StationMetadata {
        let mut meta = StationMetadata::new();
        for (k, v) in pairs {
            meta.insert(*k, *v);
        }
        meta
    }

    #[test]
    fn test_to_float_text() {
        assert_eq!(to_float("50.5 N"), Some(50.5));
        assert_eq!(to_float("50,5"), Some(50.5));
        assert_eq!(to_float("north"), None);
        assert_eq!(to_float("-7.25"), Some(-7.25));
        assert_eq!(to_float("approx. 12 m"), Some(12.0));
        assert_eq!(to_float(""), None);
    }

    #[test]
    fn test_to_float_numeric_passthrough() {
        assert_eq!(to_float(3.75), Some(3.75));
        assert_eq!(to_float(7_i64), Some(7.0));
    }

    #[test]
    fn test_latitude_preference_order() {
        let meta = metadata(&[("lat", "51.0"), ("latitude", "50.7"), ("y", "1.0")]);
        assert_eq!(latitude(&meta), Some(50.7));
    }

    #[test]
    fn test_unreadable_key_falls_through() {
        let meta = metadata(&[("latitude", "unknown"), ("northing", "5620000")]);
        assert_eq!(latitude(&meta), Some(5_620_000.0));
    }

    #[test]
    fn test_longitude_misspelled_key() {
        let meta = metadata(&[("longtitude", "7,1")]);
        assert_eq!(longitude(&meta), Some(7.1));

        let meta = metadata(&[("lng", "6.9"), ("longtitude", "7,1")]);
        assert_eq!(longitude(&meta), Some(6.9));
    }

    #[test]
    fn test_missing_coordinates() {
        let meta = metadata(&[("station", "A")]);
        assert_eq!(latitude(&meta), None);
        assert_eq!(longitude(&meta), None);
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("2048"), 2048);
        assert_eq!(parse_size(" 17 "), 17);
        assert_eq!(parse_size("n/a"), 0);
        assert_eq!(parse_size("-3"), 0);
    }
}
