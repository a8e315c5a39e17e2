use std::collections::HashSet;

use chrono::{NaiveTime, Timelike};
use polars::prelude::*;
use tracing::{debug, warn};

use crate::blocks::{is_time_label, BlockRange, TIME_LABELS};
use crate::calendar::{month_index, MONTHS};
use crate::error::{EngineError, Result};
use crate::grid::{CellValue, RawGrid};
use crate::schema::keys;

/// Parse a block into a long series `month | hour | <value_name>`.
///
/// The first row of the range is the block header. Rows whose hour cannot be
/// read, or lies outside 0..=23, are dropped. Missing or non-numeric values
/// become 0.0. Output is ordered by calendar month, then hour.
pub fn extract_block_timeseries(
    grid: &RawGrid,
    range: BlockRange,
    value_name: &str,
) -> Result<DataFrame> {
    let header_row = range.start;
    let header: Vec<String> = grid.row(header_row).iter().map(CellValue::clean_text).collect();

    // Duplicate header names: keep the first column only
    let mut seen: HashSet<&str> = HashSet::new();
    let mut columns: Vec<(usize, &str)> = Vec::new();
    for (i, name) in header.iter().enumerate() {
        if !name.is_empty() && seen.insert(name.as_str()) {
            columns.push((i, name.as_str()));
        }
    }

    let time_col = columns
        .iter()
        .find(|(_, name)| is_time_label(name))
        .or_else(|| {
            columns.iter().find(|(_, name)| {
                let lower = name.to_lowercase();
                TIME_LABELS.iter().any(|t| lower.contains(t))
            })
        })
        .map(|(i, _)| *i)
        .ok_or_else(|| {
            EngineError::at_block(header_row, format!("no time/hour column. Header was: {header:?}"))
        })?;

    // (calendar index, column index), calendar order
    let mut month_cols: Vec<(usize, usize)> = columns
        .iter()
        .filter_map(|(i, name)| month_index(name).map(|m| (m, *i)))
        .collect();
    month_cols.sort_unstable();
    month_cols.dedup_by_key(|(m, _)| *m);
    if month_cols.is_empty() {
        return Err(EngineError::at_block(
            header_row,
            format!("no month columns. Header was: {header:?}"),
        ));
    }

    let mut hour_rows: Vec<(i32, usize)> = Vec::new();
    let mut dropped = 0usize;
    for r in (header_row + 1)..range.stop {
        match parse_hour(grid.cell(r, time_col)) {
            Some(h) if (0..=23).contains(&h) => hour_rows.push((h, r)),
            Some(_) => dropped += 1,
            None => {}
        }
    }
    if dropped > 0 {
        debug!(header_row, dropped, "rows with out-of-range hours dropped");
    }

    // Stable sort keeps the first row of a repeated hour in front
    hour_rows.sort_by_key(|(h, _)| *h);
    let before = hour_rows.len();
    hour_rows.dedup_by_key(|(h, _)| *h);
    if hour_rows.len() < before {
        warn!(
            header_row,
            duplicates = before - hour_rows.len(),
            "repeated hours in block, keeping the first occurrence"
        );
    }

    let capacity = hour_rows.len() * month_cols.len();
    let mut months: Vec<&str> = Vec::with_capacity(capacity);
    let mut hours: Vec<i32> = Vec::with_capacity(capacity);
    let mut values: Vec<f64> = Vec::with_capacity(capacity);

    for &(m, c) in &month_cols {
        for &(h, r) in &hour_rows {
            months.push(MONTHS[m]);
            hours.push(h);
            values.push(grid.cell(r, c).as_f64().unwrap_or(0.0));
        }
    }

    debug!(
        header_row,
        value_name,
        months = month_cols.len(),
        hours = hour_rows.len(),
        "block extracted"
    );

    let df = DataFrame::new(vec![
        Column::new(keys::MONTH.into(), &months),
        Column::new(keys::HOUR.into(), &hours),
        Column::new(value_name.into(), &values),
    ])?;
    Ok(df)
}

/// Hour of day from a time-column cell.
///
/// Accepts plain numbers (rounded), numeric text, Excel time-of-day fractions
/// and `HH:MM[:SS]` text.
fn parse_hour(cell: &CellValue) -> Option<i32> {
    match cell {
        CellValue::Number(n) if n.is_finite() => {
            if *n > 0.0 && *n < 1.0 {
                Some((n * 24.0).round() as i32)
            } else {
                Some(n.round() as i32)
            }
        }
        CellValue::Text(s) => {
            if let Some(n) = cell.as_f64() {
                return Some(n.round() as i32);
            }
            let s = s.trim();
            NaiveTime::parse_from_str(s, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                .ok()
                .map(|t| t.hour() as i32)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.into())
    }

    fn num(n: f64) -> CellValue {
        CellValue::Number(n)
    }

    /// Header at row 0 followed by 24 hour rows; value = month*100 + hour.
    fn full_block(header: Vec<CellValue>, month_order: &[usize]) -> RawGrid {
        let mut rows = vec![header];
        for h in 0..24 {
            let mut row = vec![num(h as f64)];
            for &m in month_order {
                row.push(num((m * 100 + h) as f64));
            }
            rows.push(row);
        }
        RawGrid::from_rows(rows)
    }

    fn standard_header() -> Vec<CellValue> {
        let mut header = vec![text("Time")];
        header.extend(MONTHS.iter().map(|m| text(m)));
        header
    }

    fn f64_col(df: &DataFrame, name: &str) -> Vec<f64> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap())
            .collect()
    }

    #[test]
    fn test_full_block_has_288_rows_in_calendar_order() {
        let grid = full_block(standard_header(), &(0..12).collect::<Vec<_>>());
        let df =
            extract_block_timeseries(&grid, BlockRange { start: 0, stop: 25 }, "v").unwrap();

        assert_eq!(df.height(), 288);
        let months = df.column(keys::MONTH).unwrap().as_materialized_series().str().unwrap().clone();
        let hours = df.column(keys::HOUR).unwrap().as_materialized_series().i32().unwrap().clone();
        for i in 0..288 {
            assert_eq!(months.get(i), Some(MONTHS[i / 24]));
            assert_eq!(hours.get(i), Some((i % 24) as i32));
        }
        let values = f64_col(&df, "v");
        assert_eq!(values[24 * 3 + 5], 305.0);
    }

    #[test]
    fn test_month_columns_reordered_not_alphabetical() {
        // Columns laid out alphabetically in the sheet
        let mut alpha: Vec<usize> = (0..12).collect();
        alpha.sort_by_key(|&m| MONTHS[m]);
        let mut header = vec![text("Time")];
        header.extend(alpha.iter().map(|&m| text(MONTHS[m])));
        let grid = full_block(header, &alpha);

        let df =
            extract_block_timeseries(&grid, BlockRange { start: 0, stop: 25 }, "v").unwrap();
        let months = df.column(keys::MONTH).unwrap().as_materialized_series().str().unwrap().clone();
        assert_eq!(months.get(0), Some("Jan"));
        assert_eq!(months.get(24), Some("Feb"));
        assert_eq!(months.get(287), Some("Dec"));
        assert_eq!(f64_col(&df, "v")[24], 100.0);
    }

    #[test]
    fn test_invalid_hours_and_values() {
        let mut rows = vec![standard_header()];
        rows.push(vec![text("Hour of day")]);
        rows.push(vec![num(0.0), text("abc"), num(2.5)]);
        rows.push(vec![text(" 1 "), CellValue::Empty, text("3.5")]);
        rows.push(vec![num(24.0), num(9.0)]);
        rows.push(vec![CellValue::Empty, num(9.0)]);
        let grid = RawGrid::from_rows(rows);

        let df =
            extract_block_timeseries(&grid, BlockRange { start: 0, stop: 6 }, "v").unwrap();
        // two valid hours x twelve months
        assert_eq!(df.height(), 24);
        let values = f64_col(&df, "v");
        assert_eq!(&values[0..2], &[0.0, 0.0]);
        assert_eq!(&values[2..4], &[2.5, 3.5]);
    }

    #[test]
    fn test_time_of_day_cells() {
        assert_eq!(parse_hour(&num(0.25)), Some(6));
        assert_eq!(parse_hour(&text("17:00")), Some(17));
        assert_eq!(parse_hour(&text("05:00:00")), Some(5));
        assert_eq!(parse_hour(&num(13.0)), Some(13));
        assert_eq!(parse_hour(&text("noon")), None);
        assert_eq!(parse_hour(&CellValue::Empty), None);
    }

    #[test]
    fn test_duplicate_time_column_keeps_first() {
        let mut header = standard_header();
        header.push(text("Time"));
        let mut rows = vec![header];
        for h in 0..24 {
            let mut row = vec![num(h as f64)];
            row.extend((0..12).map(|_| num(1.0)));
            row.push(num(99.0));
            rows.push(row);
        }
        let grid = RawGrid::from_rows(rows);
        let df =
            extract_block_timeseries(&grid, BlockRange { start: 0, stop: 25 }, "v").unwrap();
        assert_eq!(df.height(), 288);
    }

    #[test]
    fn test_repeated_hour_keeps_first_row() {
        let mut rows = vec![standard_header()];
        let mut first = vec![num(3.0)];
        first.extend((0..12).map(|_| num(1.0)));
        let mut second = vec![num(3.0)];
        second.extend((0..12).map(|_| num(2.0)));
        rows.push(first);
        rows.push(second);
        let grid = RawGrid::from_rows(rows);

        let df =
            extract_block_timeseries(&grid, BlockRange { start: 0, stop: 3 }, "v").unwrap();
        assert_eq!(df.height(), 12);
        assert!(f64_col(&df, "v").iter().all(|v| *v == 1.0));
    }

    #[test]
    fn test_block_without_month_columns() {
        let mut rows = vec![Vec::new(); 7];
        rows.push(vec![text("Hour")]);
        rows.push(vec![num(0.0)]);
        let grid = RawGrid::from_rows(rows);

        let err = extract_block_timeseries(&grid, BlockRange { start: 7, stop: 9 }, "v")
            .unwrap_err();
        match err {
            EngineError::StructuralParse { location, .. } => assert!(location.contains("row 7")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_block_without_time_column() {
        let mut header = vec![text("Month")];
        header.extend(MONTHS.iter().map(|m| text(m)));
        let grid = RawGrid::from_rows(vec![header]);
        let err = extract_block_timeseries(&grid, BlockRange { start: 0, stop: 1 }, "v")
            .unwrap_err();
        assert!(matches!(err, EngineError::StructuralParse { .. }));
    }
}
