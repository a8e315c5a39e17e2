use std::collections::BTreeSet;

use polars::prelude::*;
use tracing::{debug, info};

use crate::annual::{AnnualRow, AnnualTable};
use crate::calendar::MONTHS;
use crate::config::{NettingConfig, Rate, Sizing, SolarModel};
use crate::error::{EngineError, Result};
use crate::model_builder::{require_columns, ModelTable};
use crate::schema::{costs, energy, keys, power, rates, share};
use crate::tod::TodSlot;

/// Energy for one (month, slot) pair, clipped at this granularity.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthSlotRow {
    pub month: String,
    pub slot: TodSlot,
    pub load_kwh: f64,
    pub solar_kwh: f64,
    pub wind_kwh: f64,
    pub total_re_kwh: f64,
    pub surplus_kwh: f64,
    pub grid_pre_storage_kwh: f64,
    pub grid_rate: f64,
}

#[derive(Debug, Clone)]
pub struct NettingResult {
    /// One row per (month, slot), calendar order then A, C, B, D.
    pub month_slot: DataFrame,
    pub annual: AnnualTable,
}

impl NettingResult {
    pub fn month_slot_rows(&self) -> Result<Vec<MonthSlotRow>> {
        let df = &self.month_slot;
        let months = df.column(keys::MONTH)?.as_materialized_series().str()?;
        let slots = df.column(keys::TOD_SLOT)?.as_materialized_series().str()?;

        (0..df.height())
            .map(|i| -> Result<MonthSlotRow> {
                let slot: TodSlot = slots.get(i).unwrap_or_default().parse()?;
                Ok(MonthSlotRow {
                    month: months.get(i).unwrap_or_default().to_string(),
                    slot,
                    load_kwh: value_at(df, energy::LOAD_KWH, i)?,
                    solar_kwh: value_at(df, energy::SOLAR_KWH, i)?,
                    wind_kwh: value_at(df, energy::WIND_KWH, i)?,
                    total_re_kwh: value_at(df, energy::TOTAL_RE_KWH, i)?,
                    surplus_kwh: value_at(df, energy::SURPLUS_KWH, i)?,
                    grid_pre_storage_kwh: value_at(df, energy::GRID_PRE_STORAGE_KWH, i)?,
                    grid_rate: value_at(df, rates::GRID_RATE, i)?,
                })
            })
            .collect()
    }
}

fn value_at(df: &DataFrame, name: &str, row: usize) -> Result<f64> {
    Ok(df
        .column(name)?
        .as_materialized_series()
        .f64()?
        .get(row)
        .unwrap_or(0.0))
}

fn clip_at_zero(e: Expr) -> Expr {
    when(e.clone().gt(lit(0.0))).then(e).otherwise(lit(0.0))
}

/// Typical-day hourly table → monthly energy → time-of-day netting and
/// costing.
#[derive(Debug, Clone)]
pub struct NettingEngine {
    config: NettingConfig,
}

impl NettingEngine {
    pub fn new(config: NettingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &NettingConfig {
        &self.config
    }

    pub fn run(&self, model: &ModelTable, sizing: &Sizing) -> Result<NettingResult> {
        sizing.validate()?;
        let frame = model.frame();
        let columns = &self.config.columns;

        let solar_ref = if sizing.solar_enabled() {
            columns.solar_ref(sizing.solar_mode)
        } else {
            None
        };
        let mut required = vec![
            keys::MONTH,
            keys::HOUR,
            columns.load_1mw.as_str(),
            columns.wind_1mw.as_str(),
        ];
        required.extend(solar_ref);
        require_columns(frame, &required, "netting")?;
        check_labels(frame)?;

        let month_slot = self.month_slot_frame(frame, sizing, solar_ref)?;
        debug!(rows = month_slot.height(), "month-slot rows aggregated");
        let annual = self.annual_table(&month_slot)?;

        let total = annual.total();
        info!(
            load_mw = sizing.load_mw,
            solar_mode = %sizing.solar_mode,
            solar_mw = sizing.solar_mw,
            wind_mw = sizing.wind_mw,
            re_percent = total.re_percent,
            total_cost_rs = total.total_cost_rs,
            "netting finished"
        );
        Ok(NettingResult { month_slot, annual })
    }

    /// Hourly kW -> monthly kWh -> (month, slot) sums, clipped per row.
    fn month_slot_frame(
        &self,
        frame: &DataFrame,
        sizing: &Sizing,
        solar_ref: Option<&str>,
    ) -> Result<DataFrame> {
        let columns = &self.config.columns;
        let reference = |name: &str| col(name).cast(DataType::Float64).fill_null(lit(0.0));

        let load_kw = reference(columns.load_1mw.as_str()) * lit(sizing.load_mw);
        let wind_kw = reference(columns.wind_1mw.as_str())
            * lit(sizing.wind_mw)
            * lit(1.0 - sizing.wind_loss);
        let solar_kw = match solar_ref {
            Some(name) => {
                let dc = reference(name) * lit(sizing.solar_mw) * lit(1.0 - sizing.solar_loss);
                match sizing.solar_model {
                    SolarModel::DcOnly => dc,
                    SolarModel::AcLimited { dc_ac_ratio } => {
                        let cap = sizing.solar_mw * 1000.0 / dc_ac_ratio;
                        when(dc.clone().gt(lit(cap))).then(lit(cap)).otherwise(dc)
                    }
                }
            }
            None => lit(0.0),
        };

        let days = col(keys::DAYS).cast(DataType::Float64);
        let df = frame
            .clone()
            .lazy()
            .select([
                col(keys::MONTH),
                col(keys::HOUR),
                load_kw.alias(power::LOAD_KW),
                solar_kw.alias(power::SOLAR_KW),
                wind_kw.alias(power::WIND_KW),
            ])
            .join(
                self.config.calendar.lookup_frame()?.lazy(),
                [col(keys::MONTH)],
                [col(keys::MONTH)],
                JoinArgs::new(JoinType::Left),
            )
            .join(
                self.config.tod.hour_frame()?.lazy(),
                [col(keys::HOUR)],
                [col(keys::HOUR)],
                JoinArgs::new(JoinType::Left),
            )
            // Monthly energy before any slot aggregation
            .with_columns([
                (col(power::LOAD_KW) * days.clone()).alias(energy::LOAD_KWH),
                (col(power::SOLAR_KW) * days.clone()).alias(energy::SOLAR_KWH),
                (col(power::WIND_KW) * days).alias(energy::WIND_KWH),
            ])
            .group_by([
                col(keys::MONTH),
                col(keys::MONTH_IDX),
                col(keys::TOD_SLOT),
                col(keys::SLOT_IDX),
            ])
            .agg([
                col(energy::LOAD_KWH).sum(),
                col(energy::SOLAR_KWH).sum(),
                col(energy::WIND_KWH).sum(),
            ])
            .with_column(
                (col(energy::SOLAR_KWH) + col(energy::WIND_KWH)).alias(energy::TOTAL_RE_KWH),
            )
            .with_columns([
                clip_at_zero(col(energy::TOTAL_RE_KWH) - col(energy::LOAD_KWH))
                    .alias(energy::SURPLUS_KWH),
                clip_at_zero(col(energy::LOAD_KWH) - col(energy::TOTAL_RE_KWH))
                    .alias(energy::GRID_PRE_STORAGE_KWH),
            ])
            .join(
                self.rate_frame()?
                    .lazy()
                    .select([col(keys::TOD_SLOT), col(rates::GRID_RATE)]),
                [col(keys::TOD_SLOT)],
                [col(keys::TOD_SLOT)],
                JoinArgs::new(JoinType::Left),
            )
            .sort_by_exprs(
                [col(keys::MONTH_IDX), col(keys::SLOT_IDX)],
                SortMultipleOptions::default(),
            )
            .select([
                col(keys::MONTH),
                col(keys::TOD_SLOT),
                col(energy::LOAD_KWH),
                col(energy::SOLAR_KWH),
                col(energy::WIND_KWH),
                col(energy::TOTAL_RE_KWH),
                col(energy::SURPLUS_KWH),
                col(energy::GRID_PRE_STORAGE_KWH),
                col(rates::GRID_RATE),
            ])
            .collect()?;
        Ok(df)
    }

    /// Per-slot sums with the storage credit and costs applied.
    fn annual_table(&self, month_slot: &DataFrame) -> Result<AnnualTable> {
        let storage = &self.config.storage;
        let sums: Vec<Expr> = energy::ANNUAL_SUMS.iter().map(|c| col(*c).sum()).collect();
        let filled: Vec<Expr> = energy::ANNUAL_SUMS
            .iter()
            .map(|c| col(*c).fill_null(lit(0.0)))
            .collect();

        let by_slot = month_slot
            .clone()
            .lazy()
            .group_by([col(keys::TOD_SLOT)])
            .agg(sums);

        // The slot frame drives the join so every slot is present
        let df = self
            .rate_frame()?
            .lazy()
            .join(
                by_slot,
                [col(keys::TOD_SLOT)],
                [col(keys::TOD_SLOT)],
                JoinArgs::new(JoinType::Left),
            )
            .with_columns(filled)
            .sort_by_exprs([col(keys::SLOT_IDX)], SortMultipleOptions::default())
            .with_column(
                when(col(keys::TOD_SLOT).eq(lit(storage.discharge_slot.label())))
                    .then(col(energy::SURPLUS_KWH).sum() * lit(storage.efficiency))
                    .otherwise(lit(0.0))
                    .alias(energy::STORAGE_KWH),
            )
            .with_column(
                clip_at_zero(col(energy::GRID_PRE_STORAGE_KWH) - col(energy::STORAGE_KWH))
                    .alias(energy::GRID_KWH),
            )
            .with_columns([
                (col(energy::SOLAR_KWH) * col(rates::SOLAR_RATE)).alias(costs::SOLAR_COST_RS),
                (col(energy::WIND_KWH) * col(rates::WIND_RATE)).alias(costs::WIND_COST_RS),
                (col(energy::STORAGE_KWH) * col(rates::STORAGE_RATE))
                    .alias(costs::STORAGE_COST_RS),
                (col(energy::GRID_KWH) * col(rates::GRID_RATE)).alias(costs::GRID_COST_RS),
                when(col(energy::LOAD_KWH).gt(lit(0.0)))
                    .then(
                        lit(100.0) * (col(energy::LOAD_KWH) - col(energy::GRID_KWH))
                            / col(energy::LOAD_KWH),
                    )
                    .otherwise(lit(0.0))
                    .alias(share::RE_PERCENT),
            ])
            .with_column(
                (col(costs::SOLAR_COST_RS)
                    + col(costs::WIND_COST_RS)
                    + col(costs::STORAGE_COST_RS)
                    + col(costs::GRID_COST_RS))
                .alias(costs::TOTAL_COST_RS),
            )
            .collect()?;

        let labels = df.column(keys::TOD_SLOT)?.as_materialized_series().str()?;
        let get = |name: &str, i: usize| value_at(&df, name, i);
        let rows = (0..df.height())
            .map(|i| -> Result<AnnualRow> {
                let label = labels.get(i).unwrap_or_default();
                Ok(AnnualRow {
                    label: label.to_string(),
                    slot: Some(label.parse()?),
                    load_kwh: get(energy::LOAD_KWH, i)?,
                    solar_kwh: get(energy::SOLAR_KWH, i)?,
                    wind_kwh: get(energy::WIND_KWH, i)?,
                    total_re_kwh: get(energy::TOTAL_RE_KWH, i)?,
                    surplus_kwh: get(energy::SURPLUS_KWH, i)?,
                    storage_kwh: get(energy::STORAGE_KWH, i)?,
                    grid_pre_storage_kwh: get(energy::GRID_PRE_STORAGE_KWH, i)?,
                    grid_kwh: get(energy::GRID_KWH, i)?,
                    re_percent: get(share::RE_PERCENT, i)?,
                    solar_rate: Some(get(rates::SOLAR_RATE, i)?),
                    wind_rate: Some(get(rates::WIND_RATE, i)?),
                    storage_rate: Some(get(rates::STORAGE_RATE, i)?),
                    grid_rate: Some(get(rates::GRID_RATE, i)?),
                    solar_cost_rs: get(costs::SOLAR_COST_RS, i)?,
                    wind_cost_rs: get(costs::WIND_COST_RS, i)?,
                    storage_cost_rs: get(costs::STORAGE_COST_RS, i)?,
                    grid_cost_rs: get(costs::GRID_COST_RS, i)?,
                    total_cost_rs: get(costs::TOTAL_COST_RS, i)?,
                })
            })
            .collect::<Result<Vec<AnnualRow>>>()?;

        AnnualTable::from_slot_rows(rows)
    }

    /// `tod_slot | slot_idx | solar_rate | wind_rate | storage_rate | grid_rate`,
    /// one row per slot in report order.
    fn rate_frame(&self) -> Result<DataFrame> {
        let tariffs = &self.config.tariffs;
        let per_slot = |rate: &Rate| -> Vec<f64> {
            TodSlot::ORDER.iter().map(|s| rate.for_slot(*s)).collect()
        };
        let labels: Vec<&str> = TodSlot::ORDER.iter().map(|s| s.label()).collect();
        let order: Vec<u32> = TodSlot::ORDER.iter().map(|s| s.index() as u32).collect();

        let df = DataFrame::new(vec![
            Column::new(keys::TOD_SLOT.into(), &labels),
            Column::new(keys::SLOT_IDX.into(), &order),
            Column::new(rates::SOLAR_RATE.into(), per_slot(&tariffs.solar)),
            Column::new(rates::WIND_RATE.into(), per_slot(&tariffs.wind)),
            Column::new(rates::STORAGE_RATE.into(), per_slot(&tariffs.storage)),
            Column::new(rates::GRID_RATE.into(), per_slot(&tariffs.grid)),
        ])?;
        Ok(df)
    }
}

/// Month labels must be canonical (`Jan`..`Dec`) and hours within 0..=23.
fn check_labels(frame: &DataFrame) -> Result<()> {
    let months = frame.column(keys::MONTH)?.as_materialized_series().str()?;
    let unknown: BTreeSet<String> = months
        .into_iter()
        .filter(|m| !m.is_some_and(|m| MONTHS.contains(&m)))
        .map(|m| m.unwrap_or("null").to_string())
        .collect();
    if !unknown.is_empty() {
        return Err(EngineError::UnknownLabel {
            kind: "month",
            labels: unknown.into_iter().collect(),
            expected: MONTHS.iter().map(|m| m.to_string()).collect(),
        });
    }

    let hours = frame
        .column(keys::HOUR)?
        .as_materialized_series()
        .cast(&DataType::Int32)?;
    let bad: BTreeSet<i64> = hours
        .i32()?
        .into_iter()
        .filter(|h| !h.is_some_and(|h| (0..24).contains(&h)))
        .map(|h| h.map_or(-1, i64::from))
        .collect();
    if !bad.is_empty() {
        return Err(EngineError::UnknownLabel {
            kind: "hour",
            labels: bad.into_iter().map(|h| h.to_string()).collect(),
            expected: vec!["0..=23".to_string()],
        });
    }
    Ok(())
}
