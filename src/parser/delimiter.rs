//! Separator detection for the tabular body of a station file
//!
//! Candidates are tried in a fixed order; the first one that splits the
//! header and every sampled row into the same number of fields wins. Files
//! with none of the candidate characters are treated as whitespace-aligned.

use crate::constants::{CANDIDATE_SEPARATORS, SEPARATOR_SNIFF_LINES};

/// Field separator of a tabular body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Char(u8),
    /// Runs of spaces or tabs
    Whitespace,
}

impl Separator {
    /// Byte handed to the CSV reader once the body has been normalized
    pub fn byte(self) -> u8 {
        match self {
            Separator::Char(b) => b,
            Separator::Whitespace => b'\t',
        }
    }
}

/// Pick the separator for `lines` (header first, comments already removed)
pub fn sniff_separator(lines: &[&str]) -> Separator {
    let sample: Vec<&str> = lines.iter().take(SEPARATOR_SNIFF_LINES).copied().collect();
    let Some(header) = sample.first() else {
        return Separator::Char(b',');
    };

    let consistent = CANDIDATE_SEPARATORS.iter().copied().find(|&sep| {
        let expected = count_unquoted(header, sep);
        expected > 0 && sample.iter().all(|line| count_unquoted(line, sep) == expected)
    });
    if let Some(sep) = consistent {
        return Separator::Char(sep);
    }

    // Ragged rows: fall back to whichever candidate splits the header most
    let mut best: Option<(usize, u8)> = None;
    for &sep in CANDIDATE_SEPARATORS {
        let count = count_unquoted(header, sep);
        if count > 0 && best.is_none_or(|(best_count, _)| count > best_count) {
            best = Some((count, sep));
        }
    }
    if let Some((_, sep)) = best {
        return Separator::Char(sep);
    }

    if header.split_whitespace().count() > 1 {
        Separator::Whitespace
    } else {
        Separator::Char(b',')
    }
}

/// Occurrences of `sep` outside double-quoted sections
///
/// A quote only opens a section at the start of a field, so a stray `"`
/// inside a cell does not swallow the separators after it.
fn count_unquoted(line: &str, sep: u8) -> usize {
    let mut in_quotes = false;
    let mut field_start = true;
    let mut count = 0;
    for b in line.bytes() {
        if in_quotes {
            if b == b'"' {
                in_quotes = false;
            }
        } else if b == sep {
            count += 1;
            field_start = true;
        } else if b == b'"' && field_start {
            in_quotes = true;
        } else if !b.is_ascii_whitespace() {
            field_start = false;
        }
    }
    count
}

/// Whether any field of `lines` opens with a double quote
pub fn has_quoted_fields<'a>(lines: impl IntoIterator<Item = &'a str>, sep: u8) -> bool {
    lines.into_iter().any(|line| {
        line.split(char::from(sep))
            .any(|field| field.trim_start().starts_with('"'))
    })
}

/// Rewrite whitespace-aligned lines so each field is tab-separated
pub fn normalize_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join("\t")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma() {
        let lines = ["DateTime,Value", "2024-01-01,1.0", "2024-01-02,2.0"];
        assert_eq!(sniff_separator(&lines), Separator::Char(b','));
    }

    #[test]
    fn test_semicolon_with_decimal_commas() {
        let lines = ["Time;Height_cm", "01.01.2024 00:00;12,5", "01.01.2024 01:00;12,7"];
        assert_eq!(sniff_separator(&lines), Separator::Char(b';'));
    }

    #[test]
    fn test_tab() {
        let lines = ["date\tlevel", "2024-01-01\t3.2"];
        assert_eq!(sniff_separator(&lines), Separator::Char(b'\t'));
    }

    #[test]
    fn test_quoted_separator_ignored() {
        let lines = ["\"Date, UTC\";Value", "\"2024-01-01, 00:00\";1.5"];
        assert_eq!(sniff_separator(&lines), Separator::Char(b';'));
    }

    #[test]
    fn test_stray_quote_inside_cell() {
        let lines = ["Date;Value", "2024-01-01;1", "2024-01-02;2\"", "2024-01-03;3"];
        assert_eq!(count_unquoted("a\"b;c;d", b';'), 2);
        assert_eq!(sniff_separator(&lines), Separator::Char(b';'));
        assert!(!has_quoted_fields(lines, b';'));
    }

    #[test]
    fn test_quoted_fields_detected() {
        assert!(has_quoted_fields(["Date;Value", " \"2024-01-01\";1"], b';'));
        assert!(!has_quoted_fields(["Date;Value", "2024-01-01;1"], b';'));
    }

    #[test]
    fn test_whitespace_aligned() {
        let lines = ["Date    Level", "2024-01-01   4.1"];
        assert_eq!(sniff_separator(&lines), Separator::Whitespace);
        assert_eq!(normalize_whitespace("2024-01-01   4.1"), "2024-01-01\t4.1");
    }

    #[test]
    fn test_single_column_and_empty() {
        assert_eq!(sniff_separator(&["Value", "1.0"]), Separator::Char(b','));
        assert_eq!(sniff_separator(&[]), Separator::Char(b','));
    }
}
