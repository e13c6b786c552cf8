use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use bizdiag_model::{RawRow, RawTable};
use csv::ReaderBuilder;
use tracing::debug;

use crate::cell::classify_cell;
use crate::error::{IngestError, Result};

fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_cell(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

#[derive(Debug, Default, Clone, Copy)]
struct RowStats {
    total: usize,
    non_empty: usize,
    numeric: usize,
    alpha: usize,
}

impl RowStats {
    fn ratio(self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64
        }
    }

    fn non_empty_ratio(self) -> f64 {
        self.ratio(self.non_empty)
    }

    fn numeric_ratio(self) -> f64 {
        self.ratio(self.numeric)
    }

    fn alpha_ratio(self) -> f64 {
        self.ratio(self.alpha)
    }
}

fn row_stats(row: &[String]) -> RowStats {
    let mut stats = RowStats {
        total: row.len(),
        ..RowStats::default()
    };
    for cell in row {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            continue;
        }
        stats.non_empty += 1;
        if crate::cell::parse_numeric_text(trimmed).is_some() {
            stats.numeric += 1;
        }
        if trimmed.chars().any(|ch| ch.is_ascii_alphabetic()) {
            stats.alpha += 1;
        }
    }
    stats
}

fn is_header_like(stats: RowStats) -> bool {
    stats.non_empty_ratio() >= 0.8 && stats.alpha_ratio() >= 0.5 && stats.numeric_ratio() <= 0.1
}

/// Spreadsheet exports often carry a title block above the header row.
/// Picks the first header-like row among the first few rows whose width
/// matches the widest row.
fn detect_header_row(rows: &[Vec<String>]) -> usize {
    let probe = rows.len().min(6);
    let width = rows
        .iter()
        .take(probe)
        .map(|row| row.iter().filter(|cell| !cell.trim().is_empty()).count())
        .max()
        .unwrap_or(0);
    rows.iter()
        .take(probe)
        .position(|row| {
            let filled = row.iter().filter(|cell| !cell.trim().is_empty()).count();
            filled == width && is_header_like(row_stats(row))
        })
        .unwrap_or(0)
}

/// Makes header names unique and non-empty, keeping their order.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut unique = Vec::with_capacity(headers.len());
    for (index, header) in headers.into_iter().enumerate() {
        let base = if header.is_empty() {
            format!("column_{}", index + 1)
        } else {
            header
        };
        let mut candidate = base.clone();
        let mut suffix = 2;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        unique.push(candidate);
    }
    unique
}

pub fn read_csv_table(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).map_err(|error| IngestError::io(path, error))?;
    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    read_csv_reader(&source, file)
}

pub fn read_csv_str(source: &str, text: &str) -> Result<RawTable> {
    read_csv_reader(source, text.as_bytes())
}

pub fn read_csv_reader<R: Read>(source: &str, input: R) -> Result<RawTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);
    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source_error| IngestError::Csv {
            source_name: source.to_string(),
            source: source_error,
        })?;
        let row: Vec<String> = record.iter().map(normalize_cell).collect();
        if row.iter().all(|value| value.is_empty()) {
            continue;
        }
        raw_rows.push(row);
    }
    if raw_rows.is_empty() {
        return Ok(RawTable::new(source, Vec::new()));
    }
    let header_index = detect_header_row(&raw_rows);
    let headers = dedupe_headers(
        raw_rows[header_index]
            .iter()
            .map(|value| normalize_header(value))
            .collect(),
    );
    let mut table = RawTable::new(source, headers.clone());
    for (offset, record) in raw_rows.iter().skip(header_index + 1).enumerate() {
        let mut row = RawRow::new(offset + 1);
        for (idx, header) in headers.iter().enumerate() {
            let value = record.get(idx).map(String::as_str).unwrap_or("");
            row.cells.insert(header.clone(), classify_cell(value));
        }
        table.push_row(row);
    }
    debug!(
        source,
        header_row = header_index,
        columns = table.columns.len(),
        rows = table.row_count(),
        "read csv table"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizdiag_model::CellValue;

    #[test]
    fn skips_title_rows_above_the_header() {
        let text = "Monthly P&L Export,,\nGenerated 2024-06-01,,\nMonth,Revenue,COGS\n2024-01,1000,300\n2024-02,1100,320\n";
        let table = read_csv_str("pnl.csv", text).unwrap();
        assert_eq!(table.columns, vec!["Month", "Revenue", "COGS"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0].get("Revenue"), &CellValue::Number(1000.0));
    }

    #[test]
    fn pads_short_rows_and_skips_blank_rows() {
        let text = "Date,Amount,Discount\n2024-01-03,50\n,,\n2024-01-04,60,5\n";
        let table = read_csv_str("sales.csv", text).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0].get("Discount"), &CellValue::Missing);
        assert_eq!(table.rows[1].index, 2);
    }

    #[test]
    fn dedupes_headers() {
        let headers = dedupe_headers(vec!["Amount".into(), "Amount".into(), String::new()]);
        assert_eq!(headers, vec!["Amount", "Amount_2", "column_3"]);
    }

    #[test]
    fn empty_input_is_an_empty_table() {
        let table = read_csv_str("empty.csv", "").unwrap();
        assert!(table.columns.is_empty());
        assert!(table.is_empty());
    }
}
