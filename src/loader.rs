use std::path::Path;

use polars::prelude::DataFrame;
use tracing::{debug, info};

use crate::blocks::{block_ranges, resolve_block_title, scan_header_rows, Block};
use crate::config::ExtractionConfig;
use crate::error::{EngineError, Result};
use crate::grid::{load_sheet, RawGrid};
use crate::model_builder::{build_model_table, ModelTable};
use crate::naming::NameMapper;
use crate::timeseries::extract_block_timeseries;

/// Detect every "Time × Month" block in the grid and name it.
pub fn detect_blocks(
    grid: &RawGrid,
    config: &ExtractionConfig,
    mapper: &NameMapper,
) -> Result<Vec<Block>> {
    let headers = scan_header_rows(grid, config.scan_rows);
    if headers.is_empty() {
        return Err(EngineError::StructuralParse {
            location: format!("first {} rows", config.scan_rows.min(grid.height())),
            message: "no header row with a time/hour label and all twelve months".into(),
        });
    }

    let ranges = block_ranges(&headers, grid.height());
    let titles: Vec<String> = headers
        .iter()
        .map(|&row| resolve_block_title(grid, row, config.title_lookback))
        .collect();
    let names = mapper.map_titles(&titles);

    let blocks: Vec<Block> = ranges
        .into_iter()
        .zip(titles)
        .zip(names)
        .map(|((range, title), canonical_name)| Block {
            header_row: range.start,
            stop_row: range.stop,
            title,
            canonical_name,
        })
        .collect();

    for block in &blocks {
        debug!(
            header_row = block.header_row,
            stop_row = block.stop_row,
            title = block.title.as_str(),
            name = block.canonical_name.as_str(),
            "block"
        );
    }
    info!(blocks = blocks.len(), "blocks detected");
    Ok(blocks)
}

/// Grid → blocks → per-block series → merged model table.
pub fn load_model_table_from_grid(
    grid: &RawGrid,
    config: &ExtractionConfig,
    mapper: &NameMapper,
) -> Result<(ModelTable, Vec<Block>)> {
    let blocks = detect_blocks(grid, config, mapper)?;

    let series = blocks
        .iter()
        .map(|b| extract_block_timeseries(grid, b.range(), &b.canonical_name))
        .collect::<Result<Vec<DataFrame>>>()?;
    let names: Vec<String> = blocks.iter().map(|b| b.canonical_name.clone()).collect();

    let table = build_model_table(&series, &names)?;
    Ok((table, blocks))
}

/// Read `config.sheet` from a workbook and build the model table with the
/// default name rules.
pub fn load_model_table(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<(ModelTable, Vec<Block>)> {
    let grid = load_sheet(path, &config.sheet)?;
    load_model_table_from_grid(&grid, config, &NameMapper::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::MONTHS;
    use crate::grid::CellValue;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.into())
    }

    fn push_block(rows: &mut Vec<Vec<CellValue>>, title: &str, value: f64) {
        rows.push(vec![text(title)]);
        let mut header = vec![text("Time")];
        header.extend(MONTHS.iter().map(|m| text(m)));
        rows.push(header);
        for h in 0..24 {
            let mut row = vec![CellValue::Number(h as f64)];
            row.extend((0..12).map(|_| CellValue::Number(value)));
            rows.push(row);
        }
        rows.push(Vec::new());
    }

    #[test]
    fn test_detect_and_merge_two_blocks() {
        let mut rows = vec![vec![text("Hybrid RE inputs")], Vec::new()];
        push_block(&mut rows, "Load reference 1MW", 1000.0);
        push_block(&mut rows, "Wind generation reference for 1 MW", 250.0);
        let grid = RawGrid::from_rows(rows);

        let (table, blocks) =
            load_model_table_from_grid(&grid, &ExtractionConfig::default(), &NameMapper::default())
                .unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].header_row, 3);
        assert_eq!(blocks[0].stop_row, blocks[1].header_row);
        assert_eq!(blocks[1].stop_row, grid.height());
        assert_eq!(blocks[0].canonical_name, "load_1mw");
        assert_eq!(blocks[1].canonical_name, "wind_generation_reference_for_1_mw");
        assert_eq!(table.height(), 288);
        assert_eq!(
            table.value_columns(),
            vec!["load_1mw", "wind_generation_reference_for_1_mw"]
        );
    }

    #[test]
    fn test_no_headers_is_structural_error() {
        let grid = RawGrid::from_rows(vec![vec![text("nothing here")]]);
        let err = detect_blocks(&grid, &ExtractionConfig::default(), &NameMapper::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::StructuralParse { .. }));
    }

    #[test]
    fn test_repeated_titles_get_suffixes() {
        let mut rows = Vec::new();
        push_block(&mut rows, "Wind 1MW", 1.0);
        push_block(&mut rows, "Wind 1MW", 2.0);
        let grid = RawGrid::from_rows(rows);
        let blocks =
            detect_blocks(&grid, &ExtractionConfig::default(), &NameMapper::default()).unwrap();
        let names: Vec<&str> = blocks.iter().map(|b| b.canonical_name.as_str()).collect();
        assert_eq!(names, vec!["wind_1mw", "wind_1mw_2"]);
    }
}
