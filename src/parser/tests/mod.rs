//! Shared fixtures for station parser tests


/// Station file in the layout used by the field loggers
pub fn sample_station_file() -> &'static str {
    "# station: A\n# latitude: 50,5\nDateTime,Value\n2024-01-01,1.0\n2024-01-02,2.0"
}

/// Build a station file from header pairs, a column line and rows
pub fn station_file(header: &[(&str, &str)], columns: &str, rows: &[&str]) -> String {
    let mut text = String::new();
    for (key, value) in header {
        text.push_str(&format!("# {}: {}\n", key, value));
    }
    text.push_str(columns);
    text.push('\n');
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    text
}
