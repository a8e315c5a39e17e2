use std::collections::HashMap;
use std::path::PathBuf;

use polars::prelude::*;

use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;

use crate::blocks::Block;
use crate::config::{Config, Sizing, SolarMode, SolarModel};
use crate::error::EngineError;
use crate::grid;
use crate::loader::load_model_table;
use crate::model_builder::ModelTable;
use crate::netting::NettingEngine;

/// Workbook loaded once, netted for any number of sizing options.
#[pyclass]
pub struct NettingModel {
    path: PathBuf,
    config: Config,
    model: ModelTable,
    blocks: Vec<Block>,
    engine: NettingEngine,
}

#[pymethods]
impl NettingModel {
    /// Args:
    ///     path: workbook to read
    ///     sheet: sheet holding the Time × Month blocks (default from config, "Data")
    ///     config: optional TOML settings file
    #[new]
    #[pyo3(signature = (path, sheet=None, config=None))]
    fn new(path: String, sheet: Option<String>, config: Option<String>) -> PyResult<Self> {
        let mut config = match config {
            Some(file) => Config::from_file(file)?,
            None => Config::default(),
        };
        if let Some(sheet) = sheet {
            config.extraction.sheet = sheet;
        }

        let path = PathBuf::from(path);
        let (model, blocks) = load_model_table(&path, &config.extraction)?;
        let engine = NettingEngine::new(config.netting.clone())?;
        Ok(Self {
            path,
            config,
            model,
            blocks,
            engine,
        })
    }

    // ── Properties ──────────────────────────────────────────────────────────

    #[getter]
    fn path(&self) -> String {
        self.path.display().to_string()
    }

    #[getter]
    fn model_df(&self) -> PyDataFrame {
        PyDataFrame(self.model.frame().clone())
    }

    /// Detected blocks: header_row, stop_row, title, canonical_name.
    #[getter]
    fn blocks(&self) -> PyResult<PyDataFrame> {
        let header_rows: Vec<u64> = self.blocks.iter().map(|b| b.header_row as u64).collect();
        let stop_rows: Vec<u64> = self.blocks.iter().map(|b| b.stop_row as u64).collect();
        let titles: Vec<&str> = self.blocks.iter().map(|b| b.title.as_str()).collect();
        let names: Vec<&str> = self
            .blocks
            .iter()
            .map(|b| b.canonical_name.as_str())
            .collect();
        let df = DataFrame::new(vec![
            Column::new("header_row".into(), &header_rows),
            Column::new("stop_row".into(), &stop_rows),
            Column::new("title".into(), &titles),
            Column::new("canonical_name".into(), &names),
        ])
        .map_err(EngineError::from)?;
        Ok(PyDataFrame(df))
    }

    // ── Netting ─────────────────────────────────────────────────────────────

    /// Annual time-of-day table for one sizing option.
    ///
    /// Unset arguments fall back to the `[sizing]` table of the config.
    /// `dc_ac_ratio` switches solar to the AC-limited model.
    #[allow(clippy::too_many_arguments)]
    #[pyo3(signature = (
        load_mw = None,
        solar_mode = None,
        solar_mw = None,
        solar_loss = None,
        wind_mw = None,
        wind_loss = None,
        dc_ac_ratio = None,
        rounded = true,
    ))]
    fn run_option(
        &self,
        load_mw: Option<f64>,
        solar_mode: Option<&str>,
        solar_mw: Option<f64>,
        solar_loss: Option<f64>,
        wind_mw: Option<f64>,
        wind_loss: Option<f64>,
        dc_ac_ratio: Option<f64>,
        rounded: bool,
    ) -> PyResult<PyDataFrame> {
        let sizing = self.sizing(
            load_mw,
            solar_mode,
            solar_mw,
            solar_loss,
            wind_mw,
            wind_loss,
            dc_ac_ratio,
        )?;
        let result = self.engine.run(&self.model, &sizing)?;
        let annual = if rounded {
            result.annual.rounded()
        } else {
            result.annual
        };
        Ok(PyDataFrame(annual.to_frame()?))
    }

    /// Month × slot energy table for one sizing option.
    #[allow(clippy::too_many_arguments)]
    #[pyo3(signature = (
        load_mw = None,
        solar_mode = None,
        solar_mw = None,
        solar_loss = None,
        wind_mw = None,
        wind_loss = None,
        dc_ac_ratio = None,
    ))]
    fn month_slot(
        &self,
        load_mw: Option<f64>,
        solar_mode: Option<&str>,
        solar_mw: Option<f64>,
        solar_loss: Option<f64>,
        wind_mw: Option<f64>,
        wind_loss: Option<f64>,
        dc_ac_ratio: Option<f64>,
    ) -> PyResult<PyDataFrame> {
        let sizing = self.sizing(
            load_mw,
            solar_mode,
            solar_mw,
            solar_loss,
            wind_mw,
            wind_loss,
            dc_ac_ratio,
        )?;
        Ok(PyDataFrame(self.engine.run(&self.model, &sizing)?.month_slot))
    }

    /// Headline KPIs (unrounded) as a dict.
    #[allow(clippy::too_many_arguments)]
    #[pyo3(signature = (
        load_mw = None,
        solar_mode = None,
        solar_mw = None,
        solar_loss = None,
        wind_mw = None,
        wind_loss = None,
        dc_ac_ratio = None,
    ))]
    fn summary(
        &self,
        load_mw: Option<f64>,
        solar_mode: Option<&str>,
        solar_mw: Option<f64>,
        solar_loss: Option<f64>,
        wind_mw: Option<f64>,
        wind_loss: Option<f64>,
        dc_ac_ratio: Option<f64>,
    ) -> PyResult<HashMap<&'static str, f64>> {
        let sizing = self.sizing(
            load_mw,
            solar_mode,
            solar_mw,
            solar_loss,
            wind_mw,
            wind_loss,
            dc_ac_ratio,
        )?;
        let kpi = self.engine.run(&self.model, &sizing)?.annual.summary();
        Ok(HashMap::from([
            ("load_kwh", kpi.load_kwh),
            ("total_re_kwh", kpi.total_re_kwh),
            ("storage_kwh", kpi.storage_kwh),
            ("grid_kwh", kpi.grid_kwh),
            ("re_percent", kpi.re_percent),
            ("total_cost_rs", kpi.total_cost_rs),
        ]))
    }
}

// ── Private helpers ─────────────────────────────────────────────────────────

impl NettingModel {
    #[allow(clippy::too_many_arguments)]
    fn sizing(
        &self,
        load_mw: Option<f64>,
        solar_mode: Option<&str>,
        solar_mw: Option<f64>,
        solar_loss: Option<f64>,
        wind_mw: Option<f64>,
        wind_loss: Option<f64>,
        dc_ac_ratio: Option<f64>,
    ) -> Result<Sizing, EngineError> {
        let base = &self.config.sizing;
        let sizing = Sizing {
            load_mw: load_mw.unwrap_or(base.load_mw),
            solar_mode: match solar_mode {
                Some(mode) => mode.parse::<SolarMode>()?,
                None => base.solar_mode,
            },
            solar_mw: solar_mw.unwrap_or(base.solar_mw),
            solar_loss: solar_loss.unwrap_or(base.solar_loss),
            solar_model: match dc_ac_ratio {
                Some(dc_ac_ratio) => SolarModel::AcLimited { dc_ac_ratio },
                None => base.solar_model,
            },
            wind_mw: wind_mw.unwrap_or(base.wind_mw),
            wind_loss: wind_loss.unwrap_or(base.wind_loss),
        };
        sizing.validate()?;
        Ok(sizing)
    }
}

/// Sheet names of a workbook, in workbook order.
#[pyfunction]
pub fn list_sheets(path: &str) -> PyResult<Vec<String>> {
    Ok(grid::list_sheets(path)?)
}
