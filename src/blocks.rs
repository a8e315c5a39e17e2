//! Detection of embedded "Time × Month" tables.
//!
//! A block starts at its header row (a time/hour label plus all twelve month
//! abbreviations) and runs until the next header row or the end of the sheet.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::calendar::{month_index, MONTHS};
use crate::grid::RawGrid;

/// Header labels that identify the hour column.
pub const TIME_LABELS: [&str; 2] = ["time", "hour"];

pub const DEFAULT_SCAN_ROWS: usize = 300;
pub const DEFAULT_TITLE_LOOKBACK: usize = 4;

pub fn is_time_label(token: &str) -> bool {
    TIME_LABELS.contains(&token.trim().to_lowercase().as_str())
}

/// A detected table inside the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub header_row: usize,
    /// Exclusive.
    pub stop_row: usize,
    pub title: String,
    pub canonical_name: String,
}

impl Block {
    pub fn range(&self) -> BlockRange {
        BlockRange {
            start: self.header_row,
            stop: self.stop_row,
        }
    }
}

/// Half-open row range owned by one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub start: usize,
    pub stop: usize,
}

/// Rows among the first `scan_rows` that contain a time/hour label and every
/// month abbreviation (case-insensitive). Ascending, no duplicates.
pub fn scan_header_rows(grid: &RawGrid, scan_rows: usize) -> Vec<usize> {
    let months: HashSet<String> = MONTHS.iter().map(|m| m.to_lowercase()).collect();

    let mut headers = Vec::new();
    for r in 0..grid.height().min(scan_rows) {
        let tokens: HashSet<String> = grid
            .row(r)
            .iter()
            .filter(|c| !c.is_empty())
            .map(|c| c.token())
            .collect();
        if tokens.is_empty() {
            continue;
        }

        let has_time = TIME_LABELS.iter().any(|t| tokens.contains(*t));
        if has_time && months.is_subset(&tokens) {
            debug!(row = r, "header row detected");
            headers.push(r);
        }
    }
    headers
}

/// Each block ends where the next begins; the last one runs to `total_rows`.
pub fn block_ranges(header_rows: &[usize], total_rows: usize) -> Vec<BlockRange> {
    header_rows
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let stop = header_rows.get(i + 1).copied().unwrap_or(total_rows);
            BlockRange { start, stop }
        })
        .collect()
}

/// Nearest meaningful text above `header_row`, within `lookback` rows.
///
/// Rows are scanned nearest-first and each row left-to-right; month names and
/// time labels are skipped. Falls back to `block_<row>`.
pub fn resolve_block_title(grid: &RawGrid, header_row: usize, lookback: usize) -> String {
    let first = header_row.saturating_sub(lookback);
    for r in (first..header_row).rev() {
        for cell in grid.row(r) {
            let text = cell.clean_text();
            if text.is_empty() || month_index(&text).is_some() || is_time_label(&text) {
                continue;
            }
            return text;
        }
    }
    format!("block_{header_row}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellValue;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.into())
    }

    fn header_row(time_label: &str) -> Vec<CellValue> {
        let mut row = vec![text(time_label)];
        row.extend(MONTHS.iter().map(|m| text(m)));
        row
    }

    fn grid_with_headers_at(rows: &[usize], height: usize) -> RawGrid {
        let mut cells = vec![Vec::new(); height];
        for &r in rows {
            cells[r] = header_row("Time");
        }
        RawGrid::from_rows(cells)
    }

    #[test]
    fn test_scan_finds_all_headers_in_order() {
        let grid = grid_with_headers_at(&[3, 31, 60], 90);
        assert_eq!(scan_header_rows(&grid, DEFAULT_SCAN_ROWS), vec![3, 31, 60]);
    }

    #[test]
    fn test_scan_is_case_insensitive_and_accepts_hour() {
        let mut row = vec![text("HOUR")];
        row.extend(MONTHS.iter().map(|m| text(&m.to_uppercase())));
        let grid = RawGrid::from_rows(vec![Vec::new(), row]);
        assert_eq!(scan_header_rows(&grid, 10), vec![1]);
    }

    #[test]
    fn test_scan_requires_all_twelve_months() {
        let mut row = header_row("Time");
        row.pop();
        let grid = RawGrid::from_rows(vec![row]);
        assert!(scan_header_rows(&grid, 10).is_empty());
    }

    #[test]
    fn test_scan_requires_time_label() {
        let mut row = header_row("Time");
        row[0] = text("Month");
        let grid = RawGrid::from_rows(vec![row]);
        assert!(scan_header_rows(&grid, 10).is_empty());
    }

    #[test]
    fn test_scan_window_limits_rows() {
        let grid = grid_with_headers_at(&[2, 40], 50);
        assert_eq!(scan_header_rows(&grid, 30), vec![2]);
        // window larger than the sheet
        assert_eq!(scan_header_rows(&grid, 1_000), vec![2, 40]);
    }

    #[test]
    fn test_block_ranges_are_contiguous_and_cover_sheet() {
        let headers = [0, 27, 55, 83];
        let total = 120;
        let ranges = block_ranges(&headers, total);

        assert_eq!(ranges.len(), headers.len());
        assert_eq!(ranges[0].start, 0);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].stop, pair[1].start);
        }
        assert_eq!(ranges.last().unwrap().stop, total);
        let covered: usize = ranges.iter().map(|r| r.stop - r.start).sum();
        assert_eq!(covered, total);
    }

    #[test]
    fn test_block_ranges_empty() {
        assert!(block_ranges(&[], 10).is_empty());
    }

    #[test]
    fn test_title_nearest_above_wins() {
        let grid = RawGrid::from_rows(vec![
            vec![text("Project sheet")],
            vec![CellValue::Empty, text("  Load   reference 1MW ")],
            vec![],
            header_row("Time"),
        ]);
        assert_eq!(resolve_block_title(&grid, 3, 4), "Load reference 1MW");
    }

    #[test]
    fn test_title_skips_month_and_time_labels() {
        let grid = RawGrid::from_rows(vec![
            vec![text("Wind generation reference for 1 MW")],
            vec![text("Time"), text("Jan"), text("dec")],
            header_row("Time"),
        ]);
        assert_eq!(
            resolve_block_title(&grid, 2, 3),
            "Wind generation reference for 1 MW"
        );
    }

    #[test]
    fn test_title_fallback_outside_window() {
        let grid = RawGrid::from_rows(vec![
            vec![text("Far away title")],
            vec![],
            vec![],
            vec![],
            header_row("Time"),
        ]);
        assert_eq!(resolve_block_title(&grid, 4, 3), "block_4");
        assert_eq!(resolve_block_title(&grid, 4, 4), "Far away title");
        assert_eq!(resolve_block_title(&grid, 0, 3), "block_0");
    }
}
