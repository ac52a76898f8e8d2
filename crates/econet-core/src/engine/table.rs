//! Schema-validated data tables.
//!
//! A [`DataTable`] is a read-only ordered sequence of rows mapping column
//! names to category labels, with missing cells represented explicitly. An
//! [`EncodedTable`] resolves every network variable to a table column once
//! and encodes labels to domain codes, so later row lookups are plain index
//! arithmetic and a label outside a variable's domain becomes a reportable
//! [`RowIssue`] instead of a silent mismatch.

use rustc_hash::FxHashMap;

use crate::engine::errors::EcoNetError;
use crate::engine::structure::{NetworkStructure, VarId};

/// Why a row was flagged during encoding or inference.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RowIssueKind {
    /// An observed label is not in the variable's categorical domain.
    CategoryNotInDomain,
    /// Every completion of the row has zero joint probability; the posterior
    /// fell back to uniform.
    ZeroProbabilityEvidence,
}

/// Per-row data-quality diagnostic.
///
/// Issues are collected alongside results; they never abort a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RowIssue {
    /// Zero-based row index in the input table.
    pub row: usize,
    /// Variable the issue concerns.
    pub variable: String,
    /// Offending label, when one exists.
    pub label: Option<String>,
    pub kind: RowIssueKind,
}

/// Immutable tabular dataset: named columns, rows of optional labels.
#[derive(Debug, Clone)]
pub struct DataTable {
    columns: Vec<String>,
    column_index: FxHashMap<String, usize>,
    /// Row-major cells, `rows.len() == n_rows * columns.len()`.
    cells: Vec<Option<String>>,
}

impl DataTable {
    /// Creates an empty table with the given column names.
    ///
    /// Fails on duplicate column names.
    pub fn new<I, S>(columns: I) -> Result<Self, EcoNetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut column_index = FxHashMap::default();
        for (i, name) in columns.iter().enumerate() {
            if column_index.insert(name.clone(), i).is_some() {
                return Err(EcoNetError::Schema(format!("duplicate column '{name}'")));
            }
        }
        Ok(Self {
            columns,
            column_index,
            cells: Vec::new(),
        })
    }

    /// Appends a row. The cell count must match the column count.
    pub fn push_row(&mut self, cells: Vec<Option<String>>) -> Result<(), EcoNetError> {
        if cells.len() != self.columns.len() {
            return Err(EcoNetError::Schema(format!(
                "row has {} cells, table has {} columns",
                cells.len(),
                self.columns.len()
            )));
        }
        self.cells.extend(cells);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_index.get(name).copied()
    }

    pub fn n_rows(&self) -> usize {
        if self.columns.is_empty() {
            0
        } else {
            self.cells.len() / self.columns.len()
        }
    }

    /// Cell at (row, column), `None` if missing.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.cells[row * self.columns.len() + column].as_deref()
    }

    /// Non-missing labels of one column, in row order.
    pub fn observed_labels(&self, column: usize) -> impl Iterator<Item = &str> + '_ {
        (0..self.n_rows()).filter_map(move |row| self.cell(row, column))
    }
}

/// A [`DataTable`] encoded against one [`NetworkStructure`].
///
/// Cell `(row, var)` holds the domain code of the observed label, or `None`
/// when the cell is missing or its label was outside the domain (the latter
/// also produces a [`RowIssue`]).
#[derive(Debug, Clone)]
pub struct EncodedTable {
    n_vars: usize,
    n_rows: usize,
    codes: Vec<Option<usize>>,
}

impl EncodedTable {
    /// Encodes `table` against `structure`.
    ///
    /// Every network variable must have a column of the same name; a missing
    /// column is a fatal schema error. Out-of-domain labels are recorded as
    /// issues and encoded as missing.
    pub fn encode(
        structure: &NetworkStructure,
        table: &DataTable,
    ) -> Result<(Self, Vec<RowIssue>), EcoNetError> {
        let mut var_columns = Vec::with_capacity(structure.len());
        for id in structure.var_ids() {
            let name = &structure.variable(id).name;
            let column = table.column_index(name).ok_or_else(|| {
                EcoNetError::Schema(format!("table has no column for variable '{name}'"))
            })?;
            var_columns.push(column);
        }

        let n_vars = structure.len();
        let n_rows = table.n_rows();
        let mut codes = Vec::with_capacity(n_vars * n_rows);
        let mut issues = Vec::new();
        for row in 0..n_rows {
            for id in structure.var_ids() {
                let variable = structure.variable(id);
                let code = match table.cell(row, var_columns[id.index()]) {
                    None => None,
                    Some(label) => match variable.domain.code_of(label) {
                        Some(code) => Some(code),
                        None => {
                            issues.push(RowIssue {
                                row,
                                variable: variable.name.clone(),
                                label: Some(label.to_string()),
                                kind: RowIssueKind::CategoryNotInDomain,
                            });
                            None
                        }
                    },
                };
                codes.push(code);
            }
        }
        Ok((
            Self {
                n_vars,
                n_rows,
                codes,
            },
            issues,
        ))
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Codes of one row, indexed by [`VarId`].
    #[inline]
    pub fn row(&self, row: usize) -> &[Option<usize>] {
        &self.codes[row * self.n_vars..(row + 1) * self.n_vars]
    }

    /// Whether `row` observes `var` and all of `parents`.
    #[inline]
    pub fn observes_family(&self, row: usize, var: VarId, parents: &[VarId]) -> bool {
        let codes = self.row(row);
        codes[var.index()].is_some() && parents.iter().all(|p| codes[p.index()].is_some())
    }

    /// Restricts the table to the rows selected by `keep`, preserving order.
    pub fn filter_rows(&self, keep: impl Fn(usize) -> bool) -> Self {
        let mut codes = Vec::new();
        let mut n_rows = 0;
        for row in 0..self.n_rows {
            if keep(row) {
                codes.extend_from_slice(self.row(row));
                n_rows += 1;
            }
        }
        Self {
            n_vars: self.n_vars,
            n_rows,
            codes,
        }
    }
}
