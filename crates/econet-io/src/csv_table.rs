//! CSV ingestion into [`DataTable`] and scalar-index CSV export.
//!
//! Cells are normalized on the way in: configured missing tokens and the
//! float nodata sentinel become missing cells, and numeric cells get a
//! canonical label form so `1`, `1.0`, and `1.00` land on the same category.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use econet_core::DataTable;

use crate::IoError;

/// Float nodata sentinel commonly carried over from raster exports.
pub const DEFAULT_NODATA_SENTINEL: f64 = -3.4e38;

/// Options for CSV table loading.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Cell tokens treated as missing (compared case-insensitively after
    /// trimming).
    pub missing_tokens: Vec<String>,
    /// Numeric cells within relative tolerance of this value become missing.
    pub nodata_sentinel: Option<f64>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            missing_tokens: vec!["".into(), "na".into(), "nan".into()],
            nodata_sentinel: Some(DEFAULT_NODATA_SENTINEL),
        }
    }
}

impl LoadOptions {
    fn is_missing(&self, cell: &str) -> bool {
        let trimmed = cell.trim();
        if self
            .missing_tokens
            .iter()
            .any(|t| t.eq_ignore_ascii_case(trimmed))
        {
            return true;
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            if !value.is_finite() {
                return true;
            }
            if let Some(sentinel) = self.nodata_sentinel {
                if (value - sentinel).abs() <= sentinel.abs() * 1e-6 {
                    return true;
                }
            }
        }
        false
    }
}

/// Canonical label for a cell: numeric cells are reformatted so integral
/// values read `1.0` and non-numeric cells pass through trimmed.
pub fn canonical_label(cell: &str) -> String {
    let trimmed = cell.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => {
            if value.fract() == 0.0 {
                format!("{value:.1}")
            } else {
                value.to_string()
            }
        }
        _ => trimmed.to_string(),
    }
}

/// Reads a headed CSV into a [`DataTable`].
pub fn read_table(reader: impl Read, options: &LoadOptions) -> Result<DataTable, IoError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mut table = DataTable::new(headers)?;

    let mut missing_cells = 0usize;
    for record in csv_reader.records() {
        let record = record?;
        let cells: Vec<Option<String>> = record
            .iter()
            .map(|cell| {
                if options.is_missing(cell) {
                    missing_cells += 1;
                    None
                } else {
                    Some(canonical_label(cell))
                }
            })
            .collect();
        table.push_row(cells)?;
    }
    if missing_cells > 0 {
        tracing::debug!(missing_cells, rows = table.n_rows(), "loaded table with missing cells");
    }
    Ok(table)
}

/// Reads a headed CSV file into a [`DataTable`] with default options.
pub fn read_table_path(path: impl AsRef<Path>) -> Result<DataTable, IoError> {
    read_table(File::open(path)?, &LoadOptions::default())
}

/// Writes a [`DataTable`] back out as a headed CSV. Missing cells become
/// empty fields.
pub fn write_table(writer: impl Write, table: &DataTable) -> Result<(), IoError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(table.columns())?;
    for row in 0..table.n_rows() {
        let record: Vec<&str> = (0..table.columns().len())
            .map(|column| table.cell(row, column).unwrap_or(""))
            .collect();
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes the scalar index as a one-column CSV. Skipped rows become empty
/// cells.
pub fn write_index(mut writer: impl Write, values: &[Option<f64>]) -> Result<(), IoError> {
    writeln!(writer, "index")?;
    for value in values {
        match value {
            Some(v) => writeln!(writer, "{v}")?,
            None => writeln!(writer)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_headers_and_canonicalizes_numeric_cells() {
        let csv = "cover,condition\n1,2.0\n2.00,3\n";
        let table = read_table(Cursor::new(csv), &LoadOptions::default()).unwrap();
        assert_eq!(table.columns(), &["cover", "condition"]);
        assert_eq!(table.cell(0, 0), Some("1.0"));
        assert_eq!(table.cell(0, 1), Some("2.0"));
        assert_eq!(table.cell(1, 0), Some("2.0"));
    }

    #[test]
    fn missing_tokens_and_sentinel_become_missing_cells() {
        let csv = format!("a,b\nNA,1\n,{}\nnan,2\n", DEFAULT_NODATA_SENTINEL);
        let table = read_table(Cursor::new(csv), &LoadOptions::default()).unwrap();
        assert_eq!(table.cell(0, 0), None);
        assert_eq!(table.cell(1, 0), None);
        assert_eq!(table.cell(1, 1), None);
        assert_eq!(table.cell(2, 0), None);
        assert_eq!(table.cell(2, 1), Some("2.0"));
    }

    #[test]
    fn text_labels_pass_through() {
        let csv = "lc\nforest\n water \n";
        let table = read_table(Cursor::new(csv), &LoadOptions::default()).unwrap();
        assert_eq!(table.cell(0, 0), Some("forest"));
        assert_eq!(table.cell(1, 0), Some("water"));
    }

    #[test]
    fn tables_round_trip_through_write_and_read() {
        let csv = "a,b\n1.0,forest\n,water\n";
        let table = read_table(Cursor::new(csv), &LoadOptions::default()).unwrap();
        let mut out = Vec::new();
        write_table(&mut out, &table).unwrap();
        let again =
            read_table(Cursor::new(String::from_utf8(out).unwrap()), &LoadOptions::default())
                .unwrap();
        assert_eq!(again.cell(0, 0), Some("1.0"));
        assert_eq!(again.cell(1, 0), None);
        assert_eq!(again.cell(1, 1), Some("water"));
    }

    #[test]
    fn write_index_leaves_skipped_rows_empty() {
        let mut out = Vec::new();
        write_index(&mut out, &[Some(0.25), None, Some(1.0)]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "index\n0.25\n\n1\n");
    }
}
