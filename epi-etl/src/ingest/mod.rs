//! Reading raw source extracts as tables of named fields.
//!
//! The pipeline only requires a table shape: a header of column names and
//! rows of string fields. CSV is the format both current sources ship, but
//! nothing downstream depends on that.

pub mod fetch;

use std::path::Path;

use tracing::debug;

use crate::common::error::Result;

/// A raw source table: arbitrary column names and order, string fields.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Index of the column whose lowercased name equals `name` exactly.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.to_lowercase();
        self.columns.iter().position(|c| c.to_lowercase() == wanted)
    }

    /// Field of `row` at `index`, empty string when the row is short.
    pub fn field<'a>(row: &'a [String], index: usize) -> &'a str {
        row.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Read a CSV file into a [`RawTable`].
///
/// Flexible mode: short rows are padded with empty fields at access time and
/// long rows keep their extra fields (ignored by resolution, which only sees
/// the header).
pub fn read_csv_table(path: &Path) -> Result<RawTable> {
    debug!("Reading CSV extract from {}", path.display());
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;
    table_from_reader(&mut reader)
}

/// Read CSV text into a [`RawTable`]; used by tests and in-process handoffs.
pub fn read_csv_str(text: &str) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    table_from_reader(&mut reader)
}

fn table_from_reader<R: std::io::Read>(reader: &mut csv::Reader<R>) -> Result<RawTable> {
    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|f| f.to_string()).collect());
    }

    Ok(RawTable::new(columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv_str() {
        let table = read_csv_str("location,date,total_cases\nFrance,2021-03-01,1000\nBrazil,2021-03-01,\n").unwrap();
        assert_eq!(table.columns, vec!["location", "date", "total_cases"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0], vec!["France", "2021-03-01", "1000"]);
        assert_eq!(table.rows[1][2], "");
    }

    #[test]
    fn test_column_index_is_case_insensitive() {
        let table = read_csv_str("Location,DATE\nFrance,2021-03-01\n").unwrap();
        assert_eq!(table.column_index("location"), Some(0));
        assert_eq!(table.column_index("date"), Some(1));
        assert_eq!(table.column_index("total_cases"), None);
    }

    #[test]
    fn test_short_rows_read_as_empty_fields() {
        let table = read_csv_str("a,b,c\n1,2\n").unwrap();
        assert_eq!(RawTable::field(&table.rows[0], 1), "2");
        assert_eq!(RawTable::field(&table.rows[0], 2), "");
    }
}
