use std::fs::File;
use std::path::Path;

use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::error::{EngineError, Result};
use crate::schema::{costs, energy, keys, rates, share, TOTAL_LABEL};
use crate::tod::TodSlot;

/// Renewable share of load, in percent. Zero load gives 0.
pub fn re_percent(load_kwh: f64, grid_kwh: f64) -> f64 {
    if load_kwh > 0.0 {
        100.0 * (load_kwh - grid_kwh) / load_kwh
    } else {
        0.0
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

/// One line of the annual table: a slot, or the Total row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnualRow {
    #[serde(rename = "tod_slot")]
    pub label: String,
    /// `None` on the Total row.
    #[serde(skip)]
    pub slot: Option<TodSlot>,

    pub load_kwh: f64,
    pub solar_kwh: f64,
    pub wind_kwh: f64,
    pub total_re_kwh: f64,
    pub surplus_kwh: f64,
    pub storage_kwh: f64,
    pub grid_pre_storage_kwh: f64,
    pub grid_kwh: f64,

    pub re_percent: f64,

    pub solar_rate: Option<f64>,
    pub wind_rate: Option<f64>,
    pub storage_rate: Option<f64>,
    pub grid_rate: Option<f64>,

    pub solar_cost_rs: f64,
    pub wind_cost_rs: f64,
    pub storage_cost_rs: f64,
    pub grid_cost_rs: f64,
    pub total_cost_rs: f64,
}

impl AnnualRow {
    pub fn is_total(&self) -> bool {
        self.slot.is_none()
    }

    fn total_of(rows: &[AnnualRow]) -> AnnualRow {
        let sum = |f: fn(&AnnualRow) -> f64| rows.iter().map(f).sum::<f64>();
        let load_kwh = sum(|r| r.load_kwh);
        let grid_kwh = sum(|r| r.grid_kwh);
        AnnualRow {
            label: TOTAL_LABEL.to_string(),
            slot: None,
            load_kwh,
            solar_kwh: sum(|r| r.solar_kwh),
            wind_kwh: sum(|r| r.wind_kwh),
            total_re_kwh: sum(|r| r.total_re_kwh),
            surplus_kwh: sum(|r| r.surplus_kwh),
            storage_kwh: sum(|r| r.storage_kwh),
            grid_pre_storage_kwh: sum(|r| r.grid_pre_storage_kwh),
            grid_kwh,
            // recomputed from the sums, never averaged
            re_percent: re_percent(load_kwh, grid_kwh),
            solar_rate: None,
            wind_rate: None,
            storage_rate: None,
            grid_rate: None,
            solar_cost_rs: sum(|r| r.solar_cost_rs),
            wind_cost_rs: sum(|r| r.wind_cost_rs),
            storage_cost_rs: sum(|r| r.storage_cost_rs),
            grid_cost_rs: sum(|r| r.grid_cost_rs),
            total_cost_rs: sum(|r| r.total_cost_rs),
        }
    }

    fn rounded(&self) -> AnnualRow {
        let kwh = |v: f64| round_to(v, 0);
        let rate = |v: Option<f64>| v.map(|r| round_to(r, 2));
        AnnualRow {
            label: self.label.clone(),
            slot: self.slot,
            load_kwh: kwh(self.load_kwh),
            solar_kwh: kwh(self.solar_kwh),
            wind_kwh: kwh(self.wind_kwh),
            total_re_kwh: kwh(self.total_re_kwh),
            surplus_kwh: kwh(self.surplus_kwh),
            storage_kwh: kwh(self.storage_kwh),
            grid_pre_storage_kwh: kwh(self.grid_pre_storage_kwh),
            grid_kwh: kwh(self.grid_kwh),
            re_percent: round_to(self.re_percent, 1),
            solar_rate: rate(self.solar_rate),
            wind_rate: rate(self.wind_rate),
            storage_rate: rate(self.storage_rate),
            grid_rate: rate(self.grid_rate),
            solar_cost_rs: kwh(self.solar_cost_rs),
            wind_cost_rs: kwh(self.wind_cost_rs),
            storage_cost_rs: kwh(self.storage_cost_rs),
            grid_cost_rs: kwh(self.grid_cost_rs),
            total_cost_rs: kwh(self.total_cost_rs),
        }
    }
}

/// Headline figures for one sizing option.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub load_kwh: f64,
    pub total_re_kwh: f64,
    pub storage_kwh: f64,
    pub grid_kwh: f64,
    pub re_percent: f64,
    pub total_cost_rs: f64,
}

/// Annual result: slots A, C, B, D followed by Total.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnualTable {
    rows: Vec<AnnualRow>,
    total: AnnualRow,
}

impl AnnualTable {
    /// Build from exactly one row per slot, in report order.
    pub fn from_slot_rows(rows: Vec<AnnualRow>) -> Result<Self> {
        let slots: Vec<Option<TodSlot>> = rows.iter().map(|r| r.slot).collect();
        let expected: Vec<Option<TodSlot>> = TodSlot::ORDER.iter().copied().map(Some).collect();
        if slots != expected {
            return Err(EngineError::InvalidData(format!(
                "annual table needs one row per slot in order A, C, B, D, got {:?}",
                rows.iter().map(|r| r.label.as_str()).collect::<Vec<_>>()
            )));
        }
        let total = AnnualRow::total_of(&rows);
        Ok(Self { rows, total })
    }

    /// The four slot rows.
    pub fn rows(&self) -> &[AnnualRow] {
        &self.rows
    }

    pub fn row(&self, slot: TodSlot) -> &AnnualRow {
        &self.rows[slot.index()]
    }

    pub fn total(&self) -> &AnnualRow {
        &self.total
    }

    /// Slot rows, then Total.
    pub fn iter(&self) -> impl Iterator<Item = &AnnualRow> {
        self.rows.iter().chain(std::iter::once(&self.total))
    }

    /// Display rounding: kWh and ₹ to whole units, RE % to one decimal,
    /// rates to two decimals, ties to even.
    ///
    /// Total costs are re-summed from the rounded slot costs so the displayed
    /// column adds up.
    pub fn rounded(&self) -> AnnualTable {
        let rows: Vec<AnnualRow> = self.rows.iter().map(AnnualRow::rounded).collect();
        let sum = |f: fn(&AnnualRow) -> f64| rows.iter().map(f).sum::<f64>();
        let total = AnnualRow {
            solar_cost_rs: sum(|r| r.solar_cost_rs),
            wind_cost_rs: sum(|r| r.wind_cost_rs),
            storage_cost_rs: sum(|r| r.storage_cost_rs),
            grid_cost_rs: sum(|r| r.grid_cost_rs),
            total_cost_rs: sum(|r| r.total_cost_rs),
            ..self.total.rounded()
        };
        AnnualTable { rows, total }
    }

    pub fn summary(&self) -> KpiSummary {
        let t = &self.total;
        KpiSummary {
            load_kwh: t.load_kwh,
            total_re_kwh: t.total_re_kwh,
            storage_kwh: t.storage_kwh,
            grid_kwh: t.grid_kwh,
            re_percent: t.re_percent,
            total_cost_rs: t.total_cost_rs,
        }
    }

    pub fn to_frame(&self) -> Result<DataFrame> {
        let labels: Vec<&str> = self.iter().map(|r| r.label.as_str()).collect();
        let values = |f: fn(&AnnualRow) -> f64| self.iter().map(f).collect::<Vec<f64>>();
        let optional = |f: fn(&AnnualRow) -> Option<f64>| self.iter().map(f).collect::<Vec<_>>();

        let df = DataFrame::new(vec![
            Column::new(keys::TOD_SLOT.into(), &labels),
            Column::new(energy::LOAD_KWH.into(), values(|r| r.load_kwh)),
            Column::new(energy::SOLAR_KWH.into(), values(|r| r.solar_kwh)),
            Column::new(energy::WIND_KWH.into(), values(|r| r.wind_kwh)),
            Column::new(energy::TOTAL_RE_KWH.into(), values(|r| r.total_re_kwh)),
            Column::new(energy::SURPLUS_KWH.into(), values(|r| r.surplus_kwh)),
            Column::new(energy::STORAGE_KWH.into(), values(|r| r.storage_kwh)),
            Column::new(
                energy::GRID_PRE_STORAGE_KWH.into(),
                values(|r| r.grid_pre_storage_kwh),
            ),
            Column::new(energy::GRID_KWH.into(), values(|r| r.grid_kwh)),
            Column::new(share::RE_PERCENT.into(), values(|r| r.re_percent)),
            Column::new(rates::SOLAR_RATE.into(), optional(|r| r.solar_rate)),
            Column::new(rates::WIND_RATE.into(), optional(|r| r.wind_rate)),
            Column::new(rates::STORAGE_RATE.into(), optional(|r| r.storage_rate)),
            Column::new(rates::GRID_RATE.into(), optional(|r| r.grid_rate)),
            Column::new(costs::SOLAR_COST_RS.into(), values(|r| r.solar_cost_rs)),
            Column::new(costs::WIND_COST_RS.into(), values(|r| r.wind_cost_rs)),
            Column::new(costs::STORAGE_COST_RS.into(), values(|r| r.storage_cost_rs)),
            Column::new(costs::GRID_COST_RS.into(), values(|r| r.grid_cost_rs)),
            Column::new(costs::TOTAL_COST_RS.into(), values(|r| r.total_cost_rs)),
        ])?;
        Ok(df)
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut df = self.to_frame()?;
        CsvWriter::new(File::create(path)?).finish(&mut df)?;
        info!(path = %path.display(), "annual table written");
        Ok(())
    }

    /// JSON array of rows, slots then Total.
    pub fn to_json(&self) -> Result<String> {
        let rows: Vec<&AnnualRow> = self.iter().collect();
        Ok(serde_json::to_string_pretty(&rows)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(slot: TodSlot, load: f64, grid: f64, cost: f64) -> AnnualRow {
        AnnualRow {
            label: slot.to_string(),
            slot: Some(slot),
            load_kwh: load,
            solar_kwh: load - grid,
            wind_kwh: 0.0,
            total_re_kwh: load - grid,
            surplus_kwh: 0.0,
            storage_kwh: 0.0,
            grid_pre_storage_kwh: grid,
            grid_kwh: grid,
            re_percent: re_percent(load, grid),
            solar_rate: Some(5.05),
            wind_rate: Some(5.65),
            storage_rate: Some(6.0),
            grid_rate: Some(9.16),
            solar_cost_rs: cost,
            wind_cost_rs: 0.0,
            storage_cost_rs: 0.0,
            grid_cost_rs: 0.0,
            total_cost_rs: cost,
        }
    }

    fn table() -> AnnualTable {
        AnnualTable::from_slot_rows(vec![
            row(TodSlot::A, 100.0, 100.0, 1.0),
            row(TodSlot::C, 100.0, 0.0, 2.0),
            row(TodSlot::B, 0.0, 0.0, 3.0),
            row(TodSlot::D, 200.0, 50.0, 4.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_total_sums_and_recomputes_share() {
        let table = table();
        let total = table.total();
        assert!(total.is_total());
        assert_eq!(total.label, "Total");
        assert_eq!(total.load_kwh, 400.0);
        assert_eq!(total.grid_kwh, 150.0);
        assert_eq!(total.total_cost_rs, 10.0);
        // (400 - 150) / 400, not the mean of the slot shares
        assert_eq!(total.re_percent, 62.5);
        assert_eq!(total.grid_rate, None);
        assert_eq!(table.row(TodSlot::B).re_percent, 0.0);
    }

    #[test]
    fn test_slot_order_enforced() {
        let err = AnnualTable::from_slot_rows(vec![
            row(TodSlot::A, 1.0, 0.0, 0.0),
            row(TodSlot::B, 1.0, 0.0, 0.0),
            row(TodSlot::C, 1.0, 0.0, 0.0),
            row(TodSlot::D, 1.0, 0.0, 0.0),
        ])
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidData(_)));
    }

    #[test]
    fn test_rounding_half_to_even() {
        assert_eq!(round_to(2.5, 0), 2.0);
        assert_eq!(round_to(3.5, 0), 4.0);
        assert_eq!(round_to(1234.49, 0), 1234.0);
        assert_eq!(round_to(0.125, 2), 0.12);

        let mut rows: Vec<AnnualRow> = table().rows().to_vec();
        rows[0].load_kwh = 1000.5;
        rows[0].grid_rate = Some(6.844);
        rows[0].re_percent = 33.333;
        let rounded = AnnualTable::from_slot_rows(rows).unwrap().rounded();
        assert_eq!(rounded.rows()[0].load_kwh, 1000.0);
        assert_eq!(rounded.rows()[0].grid_rate, Some(6.84));
        assert_eq!(rounded.rows()[0].re_percent, 33.3);
    }

    #[test]
    fn test_rounded_total_cost_is_sum_of_rounded_slots() {
        let rows: Vec<AnnualRow> = TodSlot::ORDER
            .iter()
            .map(|&slot| {
                let mut r = row(slot, 1000.4, 1000.4, 0.0);
                r.grid_cost_rs = 1000.4;
                r.total_cost_rs = 1000.4;
                r
            })
            .collect();
        let table = AnnualTable::from_slot_rows(rows).unwrap();
        assert!((table.total().grid_cost_rs - 4001.6).abs() < 1e-9);

        let rounded = table.rounded();
        for r in rounded.rows() {
            assert_eq!(r.grid_cost_rs, 1000.0);
        }
        assert_eq!(rounded.total().grid_cost_rs, 4000.0);
        assert_eq!(rounded.total().total_cost_rs, 4000.0);
        // energy keeps its own rounding
        assert_eq!(rounded.total().load_kwh, 4002.0);
        assert_eq!(rounded.total().label, "Total");
    }

    #[test]
    fn test_frame_layout() {
        let df = table().to_frame().unwrap();
        assert_eq!(df.height(), 5);
        let names = df.get_column_names_str();
        assert_eq!(names[0], "tod_slot");
        assert_eq!(names[9], "re_percent");
        assert_eq!(names[18], "total_cost_rs");
        assert_eq!(names.len(), 19);
        let grid_rate = df
            .column(rates::GRID_RATE)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .clone();
        assert_eq!(grid_rate.get(0), Some(9.16));
        assert_eq!(grid_rate.get(4), None);
    }

    #[test]
    fn test_csv_and_json_exports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annual.csv");
        table().write_csv(&path).unwrap();
        let csv = std::fs::read_to_string(&path).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("tod_slot,load_kwh,solar_kwh"));
        assert_eq!(csv.lines().count(), 6);
        assert!(csv.lines().last().unwrap().starts_with("Total,"));

        let json: serde_json::Value = serde_json::from_str(&table().to_json().unwrap()).unwrap();
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[1]["tod_slot"], "C");
        assert!(rows[4]["grid_rate"].is_null());
    }

    #[test]
    fn test_summary() {
        let summary = table().summary();
        assert_eq!(summary.load_kwh, 400.0);
        assert_eq!(summary.grid_kwh, 150.0);
        assert_eq!(summary.re_percent, 62.5);
    }
}
