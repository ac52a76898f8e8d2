//! ESRI ASCII grid export of the scalar index.
//!
//! The index pipeline returns one optional scalar per input row; when the
//! rows came from a flattened raster, the caller reshapes them back to
//! (rows × cols) row-major and writes a plain-text grid. Skipped rows are
//! written as the nodata value.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::IoError;

/// Geometry and nodata settings of an exported grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
    pub xllcorner: f64,
    pub yllcorner: f64,
    pub cellsize: f64,
    pub nodata: f64,
}

impl GridSpec {
    /// Unit-cell grid at the origin with the conventional nodata value.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            xllcorner: 0.0,
            yllcorner: 0.0,
            cellsize: 1.0,
            nodata: -9999.0,
        }
    }
}

/// Writes `values` (row-major, top row first) as an ESRI ASCII grid.
///
/// Fails when the value count does not match the grid shape.
pub fn write_ascii_grid(
    mut writer: impl Write,
    spec: &GridSpec,
    values: &[Option<f64>],
) -> Result<(), IoError> {
    if values.len() != spec.rows * spec.cols {
        return Err(IoError::Shape(format!(
            "{} values cannot fill a {}x{} grid",
            values.len(),
            spec.rows,
            spec.cols
        )));
    }
    writeln!(writer, "ncols {}", spec.cols)?;
    writeln!(writer, "nrows {}", spec.rows)?;
    writeln!(writer, "xllcorner {}", spec.xllcorner)?;
    writeln!(writer, "yllcorner {}", spec.yllcorner)?;
    writeln!(writer, "cellsize {}", spec.cellsize)?;
    writeln!(writer, "NODATA_value {}", spec.nodata)?;
    for row in values.chunks(spec.cols) {
        let mut first = true;
        for value in row {
            if !first {
                write!(writer, " ")?;
            }
            first = false;
            match value {
                Some(v) if v.is_finite() => write!(writer, "{v}")?,
                _ => write!(writer, "{}", spec.nodata)?,
            }
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Writes the grid to a file.
pub fn write_ascii_grid_path(
    path: impl AsRef<Path>,
    spec: &GridSpec,
    values: &[Option<f64>],
) -> Result<(), IoError> {
    write_ascii_grid(BufWriter::new(File::create(path)?), spec, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_rows() {
        let spec = GridSpec::new(2, 3);
        let values = vec![
            Some(0.0),
            Some(0.5),
            Some(1.0),
            None,
            Some(0.25),
            Some(0.75),
        ];
        let mut out = Vec::new();
        write_ascii_grid(&mut out, &spec, &values).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ncols 3");
        assert_eq!(lines[1], "nrows 2");
        assert_eq!(lines[5], "NODATA_value -9999");
        assert_eq!(lines[6], "0 0.5 1");
        assert_eq!(lines[7], "-9999 0.25 0.75");
    }

    #[test]
    fn rejects_mismatched_shape() {
        let spec = GridSpec::new(2, 2);
        let result = write_ascii_grid(Vec::new(), &spec, &[Some(1.0)]);
        assert!(result.is_err());
    }
}
