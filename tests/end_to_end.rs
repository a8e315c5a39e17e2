use std::io::Write;

use tod_netting::calendar::MONTHS;
use tod_netting::config::{Config, ExtractionConfig};
use tod_netting::grid::{CellValue, RawGrid};
use tod_netting::schema::reference;
use tod_netting::{
    load_model_table_from_grid, NameMapper, NettingConfig, NettingEngine, Sizing, TodSlot,
};

fn text(s: &str) -> CellValue {
    CellValue::Text(s.into())
}

fn num(n: f64) -> CellValue {
    CellValue::Number(n)
}

/// Title row, header row and 24 hour rows. `month_order` sets the column
/// layout; `value` gets (month index, hour).
fn push_block(
    rows: &mut Vec<Vec<CellValue>>,
    title: &str,
    month_order: &[usize],
    hour_cell: impl Fn(usize) -> CellValue,
    value: impl Fn(usize, usize) -> f64,
) {
    rows.push(vec![CellValue::Empty, text(title)]);
    let mut header = vec![CellValue::Empty, text("Time")];
    header.extend(month_order.iter().map(|&m| text(MONTHS[m])));
    rows.push(header);
    for h in 0..24 {
        let mut row = vec![CellValue::Empty, hour_cell(h)];
        row.extend(month_order.iter().map(|&m| num(value(m, h))));
        rows.push(row);
    }
    rows.push(Vec::new());
    rows.push(Vec::new());
}

/// A sheet shaped like the reference workbook: a preamble, then load, wind
/// and SAT solar blocks at irregular offsets.
fn workbook_grid() -> RawGrid {
    let calendar: Vec<usize> = (0..12).collect();
    let mut alphabetical = calendar.clone();
    alphabetical.sort_by_key(|&m| MONTHS[m]);

    let mut rows = vec![
        vec![text("Hybrid RE sizing - hourly profiles")],
        vec![text("Prepared for"), text("Plant 1")],
        Vec::new(),
    ];
    push_block(
        &mut rows,
        "Load reference 1MW",
        &calendar,
        |h| num(h as f64),
        |_, _| 1.0,
    );
    push_block(
        &mut rows,
        "Wind generation reference for 1 MW",
        &alphabetical,
        |h| text(&format!("{h:02}:00")),
        |_, _| 0.0,
    );
    push_block(
        &mut rows,
        "SAT Solar generation reference for 1 MWp",
        &calendar,
        |h| num(h as f64),
        |_, h| if (9..17).contains(&h) { 1000.0 } else { 0.0 },
    );
    RawGrid::from_rows(rows)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * b.abs().max(1.0)
}

#[test]
fn extracts_three_blocks_into_one_model_table() {
    let grid = workbook_grid();
    let (table, blocks) =
        load_model_table_from_grid(&grid, &ExtractionConfig::default(), &NameMapper::default())
            .unwrap();

    let names: Vec<&str> = blocks.iter().map(|b| b.canonical_name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            reference::LOAD_1MW,
            reference::WIND_1MW,
            reference::SOLAR_SAT_1MWP
        ]
    );
    assert_eq!(blocks[0].header_row, 4);
    for pair in blocks.windows(2) {
        assert_eq!(pair[0].stop_row, pair[1].header_row);
    }
    assert_eq!(blocks[2].stop_row, grid.height());
    assert_eq!(table.height(), 288);
}

#[test]
fn flat_load_without_generation_imports_everything() {
    let grid = workbook_grid();
    let (table, _) =
        load_model_table_from_grid(&grid, &ExtractionConfig::default(), &NameMapper::default())
            .unwrap();

    let engine = NettingEngine::new(NettingConfig::default()).unwrap();
    let result = engine.run(&table, &Sizing::default()).unwrap();

    let grid_kwh: Vec<f64> = result.annual.rows().iter().map(|r| r.grid_kwh).collect();
    assert_eq!(grid_kwh, vec![2190.0, 1095.0, 2920.0, 2555.0]);
    for row in result.annual.iter() {
        assert_eq!(row.total_re_kwh, 0.0);
        assert_eq!(row.storage_kwh, 0.0);
        assert_eq!(row.re_percent, 0.0);
    }
    assert_eq!(result.annual.total().load_kwh, 8760.0);
}

#[test]
fn toml_configured_run_with_storage() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[netting.storage]
efficiency = 0.5

[netting.tariffs]
solar = 4.0

[sizing]
load_mw = 1000.0
solar_mode = "SAT"
solar_mw = 2.0
"#
    )
    .unwrap();
    let config = Config::from_file(file.path()).unwrap();

    let grid = workbook_grid();
    let (table, _) =
        load_model_table_from_grid(&grid, &config.extraction, &NameMapper::default()).unwrap();
    let engine = NettingEngine::new(config.netting.clone()).unwrap();
    let result = engine.run(&table, &config.sizing).unwrap();
    let annual = &result.annual;

    // slot B: 2000 kW solar against 1000 kW load, 8 hours a day
    let b = annual.row(TodSlot::B);
    assert!(close(b.surplus_kwh, 1000.0 * 8.0 * 365.0));
    assert_eq!(b.grid_kwh, 0.0);
    assert!(close(b.re_percent, 100.0));
    assert!(close(b.solar_cost_rs, b.solar_kwh * 4.0));

    let d = annual.row(TodSlot::D);
    assert!(close(d.storage_kwh, 0.5 * b.surplus_kwh));
    assert!(close(d.grid_kwh, 1000.0 * 7.0 * 365.0 - d.storage_kwh));

    let total = annual.total();
    assert!(close(
        total.re_percent,
        100.0 * (total.load_kwh - total.grid_kwh) / total.load_kwh
    ));
    assert!(close(
        total.total_cost_rs,
        annual.rows().iter().map(|r| r.total_cost_rs).sum::<f64>()
    ));

    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("annual.csv");
    annual.rounded().write_csv(&csv).unwrap();
    let content = std::fs::read_to_string(&csv).unwrap();
    assert_eq!(content.lines().count(), 6);
    assert!(content.lines().nth(4).unwrap().starts_with("D,"));

    let summary = annual.summary();
    assert_eq!(summary.grid_kwh, total.grid_kwh);
}
