//! Observation CSV ingest.
//!
//! Turns a CSV of `(input, rate)` pairs into observations that are safe to
//! fit. Required columns are strict; bad rows are skipped and reported.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use log::warn;

use crate::domain::Observation;
use crate::error::IoError;

const INPUT_ALIASES: [&str; 4] = ["input", "x", "temperature", "temp"];
const RATE_ALIASES: [&str; 4] = ["rate", "y", "growth_rate", "observed_rate"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct IngestedObservations {
    pub observations: Vec<Observation>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load observations from a CSV file with a header row.
pub fn load_observations(path: &Path) -> Result<IngestedObservations, IoError> {
    let file = File::open(path).map_err(|source| IoError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(file);

    let csv_error = |message: String| IoError::Csv {
        path: path.to_path_buf(),
        message,
    };

    let headers = reader
        .headers()
        .map_err(|e| csv_error(format!("failed to read headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let input_col = find_column(&header_map, &INPUT_ALIASES)
        .ok_or_else(|| csv_error(format!("missing input column (one of {})", INPUT_ALIASES.join(", "))))?;
    let rate_col = find_column(&header_map, &RATE_ALIASES)
        .ok_or_else(|| csv_error(format!("missing rate column (one of {})", RATE_ALIASES.join(", "))))?;

    let mut observations = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let parsed = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| parse_row(&record, input_col, rate_col));

        match parsed {
            Ok(obs) => observations.push(obs),
            Err(message) => {
                warn!("{}:{line}: skipping row: {message}", path.display());
                row_errors.push(RowError { line, message });
            }
        }
    }

    if observations.is_empty() {
        return Err(IoError::NoRows(path.to_path_buf()));
    }

    Ok(IngestedObservations {
        observations,
        row_errors,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn find_column(header_map: &HashMap<String, usize>, aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|a| header_map.get(*a).copied())
}

fn parse_row(record: &StringRecord, input_col: usize, rate_col: usize) -> Result<Observation, String> {
    let input = parse_field(record, input_col, "input")?;
    let rate = parse_field(record, rate_col, "rate")?;
    Ok(Observation::new(input, rate))
}

fn parse_field(record: &StringRecord, col: usize, what: &str) -> Result<f64, String> {
    let raw = record
        .get(col)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing {what} value"))?;
    let value: f64 = raw.parse().map_err(|_| format!("invalid {what} value '{raw}'"))?;
    if !value.is_finite() {
        return Err(format!("non-finite {what} value '{raw}'"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_aliased_headers() {
        let file = write_csv("\u{feff}Temperature,Growth_Rate\n283.15,0.05\n293.15,0.12\n");
        let data = load_observations(file.path()).unwrap();
        assert_eq!(data.observations, vec![Observation::new(283.15, 0.05), Observation::new(293.15, 0.12)]);
        assert!(data.row_errors.is_empty());
    }

    #[test]
    fn skips_and_reports_bad_rows() {
        let file = write_csv("input,rate\n1.0,0.1\nabc,0.2\n3.0,\n4.0,NaN\n5.0,0.5\n");
        let data = load_observations(file.path()).unwrap();
        assert_eq!(data.rows_read, 5);
        assert_eq!(data.observations.len(), 2);
        let lines: Vec<usize> = data.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, [3, 4, 5]);
    }

    #[test]
    fn missing_rate_column_is_an_error() {
        let file = write_csv("input,other\n1.0,0.1\n");
        assert!(matches!(load_observations(file.path()), Err(IoError::Csv { .. })));
    }

    #[test]
    fn no_valid_rows_is_an_error() {
        let file = write_csv("input,rate\nx,y\n");
        assert!(matches!(load_observations(file.path()), Err(IoError::NoRows(_))));
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_observations(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, IoError::Open { .. }));
    }
}
