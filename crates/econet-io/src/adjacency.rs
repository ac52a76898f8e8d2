//! Adjacency-matrix CSV parsing.
//!
//! The matrix is a headed CSV whose first column carries the row labels:
//! header `,v1,v2,...` and one record per variable. A cell equal to `1`
//! at (row r, column c) declares the arc r → c; empty cells, `0`, and `NA`
//! declare nothing. Endpoint names are validated downstream when the arcs
//! are added to the network builder.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::IoError;

/// A parsed adjacency specification: the variable ordering from the header
/// and the declared arcs as (parent, child) name pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacencySpec {
    pub variables: Vec<String>,
    pub arcs: Vec<(String, String)>,
}

fn cell_declares_arc(cell: &str) -> Result<bool, IoError> {
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("na") {
        return Ok(false);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v == 0.0 => Ok(false),
        Ok(v) if v == 1.0 => Ok(true),
        _ => Err(IoError::Parse(format!(
            "adjacency cell '{trimmed}' is neither 0, 1, nor missing"
        ))),
    }
}

/// Parses an adjacency matrix from a reader.
pub fn read_adjacency(reader: impl Read) -> Result<AdjacencySpec, IoError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    if headers.len() < 2 {
        return Err(IoError::Shape(
            "adjacency matrix needs a row-label column plus at least one variable".into(),
        ));
    }
    let variables: Vec<String> = headers
        .iter()
        .skip(1)
        .map(|h| h.trim().to_string())
        .collect();

    let mut arcs = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        if record.len() != headers.len() {
            return Err(IoError::Shape(format!(
                "adjacency row has {} cells, header has {}",
                record.len(),
                headers.len()
            )));
        }
        let parent = record
            .get(0)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| IoError::Parse("adjacency row without a row label".into()))?;
        for (child, cell) in variables.iter().zip(record.iter().skip(1)) {
            if cell_declares_arc(cell)? {
                arcs.push((parent.to_string(), child.clone()));
            }
        }
    }
    Ok(AdjacencySpec { variables, arcs })
}

/// Parses an adjacency matrix file.
pub fn read_adjacency_path(path: impl AsRef<Path>) -> Result<AdjacencySpec, IoError> {
    read_adjacency(File::open(path)?)
}
