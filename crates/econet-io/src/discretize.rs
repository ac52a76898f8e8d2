//! Equal-width discretization of numeric columns.
//!
//! Fit-then-transform: [`EqualWidthDiscretizer::fit`] records each column's
//! observed `[min, max]`, and `transform` maps numeric cells to interval
//! labels `(lo, hi]` over `bins` equal-width intervals. Values beyond the
//! fitted range clamp to the edge intervals, so a transform on a second
//! table never invents new categories.

use rustc_hash::FxHashMap;

use econet_core::DataTable;

use crate::IoError;

/// Per-column fitted range.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FittedRange {
    min: f64,
    max: f64,
}

/// Equal-width discretizer over a set of numeric columns.
#[derive(Debug, Clone)]
pub struct EqualWidthDiscretizer {
    bins: usize,
    ranges: FxHashMap<String, FittedRange>,
}

impl EqualWidthDiscretizer {
    /// Creates an unfitted discretizer with `bins` intervals per column.
    pub fn new(bins: usize) -> Result<Self, IoError> {
        if bins == 0 {
            return Err(IoError::Parse("discretizer needs at least one bin".into()));
        }
        Ok(Self {
            bins,
            ranges: FxHashMap::default(),
        })
    }

    /// Fits the per-column ranges on `columns` of `table`.
    ///
    /// Missing cells are skipped; a column with no numeric cells is an
    /// error, as is a non-numeric cell in a selected column.
    pub fn fit(&mut self, table: &DataTable, columns: &[String]) -> Result<(), IoError> {
        for name in columns {
            let column = table.column_index(name).ok_or_else(|| {
                IoError::Shape(format!("no column '{name}' to discretize"))
            })?;
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for row in 0..table.n_rows() {
                if let Some(cell) = table.cell(row, column) {
                    let value = parse_numeric(name, cell)?;
                    min = min.min(value);
                    max = max.max(value);
                }
            }
            if min > max {
                return Err(IoError::Parse(format!(
                    "column '{name}' has no observed values to fit on"
                )));
            }
            self.ranges.insert(name.clone(), FittedRange { min, max });
        }
        Ok(())
    }

    /// Transforms every fitted column of `table` to interval labels.
    ///
    /// Unfitted columns pass through unchanged; missing cells stay missing.
    pub fn transform(&self, table: &DataTable) -> Result<DataTable, IoError> {
        let mut out = DataTable::new(table.columns().iter().cloned())?;
        let fitted: Vec<Option<&FittedRange>> = table
            .columns()
            .iter()
            .map(|name| self.ranges.get(name))
            .collect();

        for row in 0..table.n_rows() {
            let mut cells = Vec::with_capacity(table.columns().len());
            for (column, range) in fitted.iter().enumerate() {
                let cell = table.cell(row, column);
                let transformed = match (cell, range) {
                    (None, _) => None,
                    (Some(label), None) => Some(label.to_string()),
                    (Some(label), Some(range)) => {
                        let value = parse_numeric(&table.columns()[column], label)?;
                        Some(self.interval_label(range, value))
                    }
                };
                cells.push(transformed);
            }
            out.push_row(cells)?;
        }
        Ok(out)
    }

    /// Interval label for `value` under a fitted range, clamped to the edge
    /// bins.
    fn interval_label(&self, range: &FittedRange, value: f64) -> String {
        let width = (range.max - range.min) / self.bins as f64;
        let bin = if width > 0.0 {
            (((value - range.min) / width).floor() as i64)
                .clamp(0, self.bins as i64 - 1) as usize
        } else {
            0
        };
        let lo = range.min + bin as f64 * width;
        let hi = range.min + (bin + 1) as f64 * width;
        format!("({lo:.6}, {hi:.6}]")
    }
}

fn parse_numeric(column: &str, cell: &str) -> Result<f64, IoError> {
    cell.trim().parse::<f64>().map_err(|_| {
        IoError::Parse(format!(
            "non-numeric cell '{cell}' in discretized column '{column}'"
        ))
    })
}
