//! Timestamp and value column inference
//!
//! Station files name their columns freely (`DateTime`, `Time`, `Height_cm`,
//! `water_level`, ...). Selection is by case-insensitive substring match with
//! positional fallbacks.

use crate::constants::{DATETIME_COLUMN_PREFERENCES, VALUE_COLUMN_MARKERS};
use crate::error::{Result, StationError};

/// Indices of the columns that become `DateTime` and `Value`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSelection {
    pub datetime: usize,
    pub value: usize,
}

impl ColumnSelection {
    /// Choose columns from trimmed header `names`
    pub fn infer(names: &[String], source_name: &str) -> Result<Self> {
        if names.is_empty() {
            return Err(StationError::InvalidFormat {
                source_name: source_name.to_string(),
                reason: "no columns in tabular body".to_string(),
            });
        }

        let lowered: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();

        let datetime = datetime_column(&lowered).unwrap_or(0);
        let value = value_column(&lowered)
            .or(if names.len() > 1 { Some(1) } else { None })
            .ok_or_else(|| StationError::MissingValueColumn {
                source_name: source_name.to_string(),
            })?;

        Ok(Self { datetime, value })
    }
}

/// Each preference is tried against every column before moving to the next
fn datetime_column(lowered: &[String]) -> Option<usize> {
    DATETIME_COLUMN_PREFERENCES
        .iter()
        .find_map(|pref| lowered.iter().position(|name| name.contains(pref)))
}

/// First column mentioning any value marker
fn value_column(lowered: &[String]) -> Option<usize> {
    lowered.iter().position(|name| {
        VALUE_COLUMN_MARKERS
            .iter()
            .any(|marker| name.contains(marker))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_named_columns() {
        let sel = ColumnSelection::infer(&names(&["Time", "Height_cm"]), "f.txt").unwrap();
        assert_eq!(sel, ColumnSelection { datetime: 0, value: 1 });
    }

    #[test]
    fn test_positional_fallback() {
        let sel = ColumnSelection::infer(&names(&["A", "B"]), "f.txt").unwrap();
        assert_eq!(sel, ColumnSelection { datetime: 0, value: 1 });
    }

    #[test]
    fn test_datetime_preference_order() {
        // "time" appears first but "date" ranks higher
        let sel =
            ColumnSelection::infer(&names(&["obs_time", "Date", "Water_Level"]), "f.txt").unwrap();
        assert_eq!(sel, ColumnSelection { datetime: 1, value: 2 });

        let sel =
            ColumnSelection::infer(&names(&["Date", "DateTime", "Value"]), "f.txt").unwrap();
        assert_eq!(sel.datetime, 1);
    }

    #[test]
    fn test_value_column_anywhere() {
        let sel =
            ColumnSelection::infer(&names(&["id", "quality", "stage_level", "Timestamp"]), "f.txt")
                .unwrap();
        assert_eq!(sel, ColumnSelection { datetime: 3, value: 2 });
    }

    #[test]
    fn test_single_column_without_value() {
        let err = ColumnSelection::infer(&names(&["DateTime"]), "lonely.txt").unwrap_err();
        match err {
            StationError::MissingValueColumn { source_name } => assert_eq!(source_name, "lonely.txt"),
            other => panic!("Expected MissingValueColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_single_matching_column() {
        let sel = ColumnSelection::infer(&names(&["level"]), "f.txt").unwrap();
        assert_eq!(sel, ColumnSelection { datetime: 0, value: 0 });
    }
}
