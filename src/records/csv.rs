//! Minimal CSV reader/writer for customer uploads.
//!
//! The format is deliberately simple: one header row, comma-delimited
//! fields, no quoting. A comma inside a value (for example a multi-tag
//! `Product Preferences` cell) cannot be represented and will show up as a
//! column-count error on that row.

use std::fs;
use std::path::Path;

use super::{Column, CustomerRecord, parse_finite};
use crate::error::ParseError;

/// Parse uploaded CSV text into customer records, in row order.
///
/// Blank lines are skipped. Header cells are matched case-insensitively
/// against [`Column`]. Row numbers in errors count data rows from 1.
pub fn parse_csv(text: &str) -> Result<Vec<CustomerRecord>, ParseError> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let header = lines.next().ok_or(ParseError::MissingRows)?;
    let columns = parse_header(header)?;
    let rows: Vec<&str> = lines.collect();
    if rows.is_empty() {
        return Err(ParseError::MissingRows);
    }

    rows.iter()
        .enumerate()
        .map(|(idx, row)| parse_row(row, idx + 1, &columns))
        .collect()
}

/// Read a UTF-8 file from disk and parse it with [`parse_csv`].
pub fn parse_csv_file(path: &Path) -> Result<Vec<CustomerRecord>, ParseError> {
    let text = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_csv(&text)
}

/// Serialize records with the full canonical header.
///
/// Fields are written verbatim, so values containing commas or line breaks
/// will not survive a round trip through [`parse_csv`].
pub fn to_csv(records: &[CustomerRecord]) -> String {
    let mut out = Column::ALL
        .iter()
        .map(|c| c.header())
        .collect::<Vec<_>>()
        .join(",");
    out.push('\n');

    for record in records {
        let row = Column::ALL
            .iter()
            .map(|&c| record.text(c))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&row);
        out.push('\n');
    }
    out
}

fn parse_header(line: &str) -> Result<Vec<Column>, ParseError> {
    line.split(',')
        .map(|cell| {
            Column::from_header(cell).ok_or_else(|| ParseError::UnknownHeader {
                header: cell.trim().to_ascii_lowercase(),
                expected: Column::expected_headers(),
            })
        })
        .collect()
}

fn parse_row(line: &str, row: usize, columns: &[Column]) -> Result<CustomerRecord, ParseError> {
    let values: Vec<&str> = line.split(',').collect();
    if values.len() != columns.len() {
        return Err(ParseError::ColumnCount {
            row,
            expected: columns.len(),
            actual: values.len(),
        });
    }

    let mut record = CustomerRecord::default();
    for (&column, raw) in columns.iter().zip(values) {
        let value = raw.trim();
        let number = if column.is_numeric() {
            parse_finite(value)
        } else {
            None
        };
        record.assign(column, value, number);
    }

    if record.customer_id.is_empty() {
        return Err(ParseError::MissingCustomerId { row });
    }
    Ok(record)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
