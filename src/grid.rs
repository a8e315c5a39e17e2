//! Materialised sheet contents.
//!
//! The workbook is read once into a [`RawGrid`]; header detection, title
//! lookup and block extraction all work on that in-memory copy.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use tracing::{debug, info};

use crate::error::{EngineError, Result};

/// One untyped cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text form with whitespace runs collapsed. Whole numbers print without
    /// a fractional part.
    pub fn clean_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.split_whitespace().collect::<Vec<_>>().join(" "),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                format!("{}", *n as i64)
            }
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(b) => b.to_string(),
        }
    }

    /// Lower-cased [`CellValue::clean_text`], used for label matching.
    pub fn token(&self) -> String {
        self.clean_text().to_lowercase()
    }

    /// Numeric value of the cell. Text is parsed after trimming and
    /// stripping thousands separators.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Text(s) => {
                let s = s.trim().replace(',', "");
                if s.is_empty() {
                    return None;
                }
                s.parse::<f64>().ok().filter(|v| v.is_finite())
            }
            _ => None,
        }
    }
}

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
            Data::Error(_) | Data::Empty => CellValue::Empty,
        }
    }
}

/// Row-major sheet contents addressed by absolute sheet position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGrid {
    rows: Vec<Vec<CellValue>>,
}

impl RawGrid {
    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// Convert a calamine range. The used range may start below/right of A1;
    /// it is padded so indices match the sheet's own row numbers (0-based).
    pub fn from_range(range: &Range<Data>) -> Self {
        let (start_row, start_col) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); start_row];
        for row in range.rows() {
            let mut cells = vec![CellValue::Empty; start_col];
            cells.extend(row.iter().map(CellValue::from));
            rows.push(cells);
        }
        Self { rows }
    }

    /// Total number of rows, including leading blank rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, index: usize) -> &[CellValue] {
        self.rows.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.row(row).get(col).unwrap_or(&CellValue::Empty)
    }
}

/// Names of all sheets in a workbook.
pub fn list_sheets(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let workbook = open_workbook_auto(path.as_ref())?;
    Ok(workbook.sheet_names().to_vec())
}

/// Read one sheet fully into memory.
pub fn load_sheet(path: impl AsRef<Path>, sheet: &str) -> Result<RawGrid> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)?;

    let sheet_names = workbook.sheet_names().to_vec();
    if !sheet_names.iter().any(|s| s == sheet) {
        return Err(EngineError::SheetNotFound {
            sheet: sheet.to_string(),
            available: sheet_names,
        });
    }

    let range = workbook.worksheet_range(sheet)?;
    let grid = RawGrid::from_range(&range);
    info!(
        path = %path.display(),
        sheet,
        rows = grid.height(),
        "loaded sheet"
    );
    debug!(start = ?range.start(), end = ?range.end(), "used range");
    Ok(grid)
}
