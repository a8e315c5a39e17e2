use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::blocks::{DEFAULT_SCAN_ROWS, DEFAULT_TITLE_LOOKBACK};
use crate::calendar::Calendar;
use crate::error::{EngineError, Result};
use crate::schema::reference;
use crate::tod::{TodScheme, TodSlot};

// ── Sizing ──────────────────────────────────────────────────────────────────

/// Solar generation profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum SolarMode {
    #[default]
    None,
    /// Fixed tilt
    Ft,
    /// Single-axis tracker
    Sat,
    /// East-west
    Ew,
}

impl SolarMode {
    pub const LABELS: [&'static str; 4] = ["FT", "SAT", "EW", "None"];
}

impl fmt::Display for SolarMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SolarMode::None => "None",
            SolarMode::Ft => "FT",
            SolarMode::Sat => "SAT",
            SolarMode::Ew => "EW",
        };
        f.write_str(label)
    }
}

impl FromStr for SolarMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FT" => Ok(SolarMode::Ft),
            "SAT" => Ok(SolarMode::Sat),
            "EW" => Ok(SolarMode::Ew),
            "" | "NONE" => Ok(SolarMode::None),
            _ => Err(EngineError::UnknownLabel {
                kind: "solar mode",
                labels: vec![s.to_string()],
                expected: SolarMode::LABELS.iter().map(|l| l.to_string()).collect(),
            }),
        }
    }
}

impl TryFrom<String> for SolarMode {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// How DC solar output becomes delivered energy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SolarModel {
    /// No inverter cap. Matches the reference workbook.
    #[default]
    DcOnly,
    /// Hourly output capped at `solar_mw * 1000 / dc_ac_ratio` kW.
    AcLimited { dc_ac_ratio: f64 },
}

/// User-chosen plant sizes. Losses are fractions in [0, 1).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Sizing {
    pub load_mw: f64,
    pub solar_mode: SolarMode,
    /// DC capacity, MWp
    pub solar_mw: f64,
    pub solar_loss: f64,
    pub solar_model: SolarModel,
    pub wind_mw: f64,
    pub wind_loss: f64,
}

impl Default for Sizing {
    fn default() -> Self {
        Self {
            load_mw: 1.0,
            solar_mode: SolarMode::None,
            solar_mw: 0.0,
            solar_loss: 0.0,
            solar_model: SolarModel::DcOnly,
            wind_mw: 0.0,
            wind_loss: 0.0,
        }
    }
}

impl Sizing {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let sizing: Sizing = serde_json::from_str(s)?;
        sizing.validate()?;
        Ok(sizing)
    }

    /// Solar is modelled only with a profile selected and positive capacity.
    pub fn solar_enabled(&self) -> bool {
        self.solar_mode != SolarMode::None && self.solar_mw > 0.0
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("load_mw", self.load_mw),
            ("solar_mw", self.solar_mw),
            ("wind_mw", self.wind_mw),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        for (name, value) in [("solar_loss", self.solar_loss), ("wind_loss", self.wind_loss)] {
            if !(0.0..1.0).contains(&value) {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be a fraction in [0, 1), got {value}"
                )));
            }
        }
        if let SolarModel::AcLimited { dc_ac_ratio } = self.solar_model {
            if !dc_ac_ratio.is_finite() || dc_ac_ratio <= 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "dc_ac_ratio must be positive, got {dc_ac_ratio}"
                )));
            }
        }
        Ok(())
    }
}

// ── Tariffs ─────────────────────────────────────────────────────────────────

/// One rate per slot, ₹/kWh.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SlotRates {
    #[serde(rename = "A")]
    pub a: f64,
    #[serde(rename = "C")]
    pub c: f64,
    #[serde(rename = "B")]
    pub b: f64,
    #[serde(rename = "D")]
    pub d: f64,
}

impl SlotRates {
    pub fn get(&self, slot: TodSlot) -> f64 {
        match slot {
            TodSlot::A => self.a,
            TodSlot::C => self.c,
            TodSlot::B => self.b,
            TodSlot::D => self.d,
        }
    }
}

/// Price of one energy source: flat, or varying by slot.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Rate {
    Flat(f64),
    PerSlot(SlotRates),
}

impl Rate {
    pub fn for_slot(&self, slot: TodSlot) -> f64 {
        match self {
            Rate::Flat(r) => *r,
            Rate::PerSlot(rates) => rates.get(slot),
        }
    }

    fn validate(&self, source: &str) -> Result<()> {
        for slot in TodSlot::ORDER {
            let r = self.for_slot(slot);
            if !r.is_finite() || r < 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "{source} rate for slot {slot} must be non-negative, got {r}"
                )));
            }
        }
        Ok(())
    }
}

/// Default grid time-of-day tariff.
pub const DEFAULT_GRID_TOD: SlotRates = SlotRates {
    a: 6.84,
    c: 9.16,
    b: 6.30,
    d: 9.46,
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TariffRates {
    pub solar: Rate,
    pub wind: Rate,
    pub storage: Rate,
    pub grid: Rate,
}

impl Default for TariffRates {
    fn default() -> Self {
        Self {
            solar: Rate::Flat(5.05),
            wind: Rate::Flat(5.65),
            storage: Rate::Flat(6.00),
            grid: Rate::PerSlot(DEFAULT_GRID_TOD),
        }
    }
}

impl TariffRates {
    pub fn validate(&self) -> Result<()> {
        self.solar.validate("solar")?;
        self.wind.validate("wind")?;
        self.storage.validate("storage")?;
        self.grid.validate("grid")
    }
}

// ── Storage ─────────────────────────────────────────────────────────────────

/// Simplified storage: a fraction of total surplus credited to one slot.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub efficiency: f64,
    pub discharge_slot: TodSlot,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            efficiency: 0.80,
            discharge_slot: TodSlot::D,
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.efficiency) {
            return Err(EngineError::InvalidConfig(format!(
                "storage efficiency must be in [0, 1], got {}",
                self.efficiency
            )));
        }
        Ok(())
    }
}

// ── Column map ──────────────────────────────────────────────────────────────

/// Model-table columns read by the netting engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub load_1mw: String,
    pub wind_1mw: String,
    pub solar_ft_1mwp: String,
    pub solar_sat_1mwp: String,
    pub solar_ew_1mwp: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            load_1mw: reference::LOAD_1MW.to_string(),
            wind_1mw: reference::WIND_1MW.to_string(),
            solar_ft_1mwp: reference::SOLAR_FT_1MWP.to_string(),
            solar_sat_1mwp: reference::SOLAR_SAT_1MWP.to_string(),
            solar_ew_1mwp: reference::SOLAR_EW_1MWP.to_string(),
        }
    }
}

impl ColumnMap {
    pub fn solar_ref(&self, mode: SolarMode) -> Option<&str> {
        match mode {
            SolarMode::None => None,
            SolarMode::Ft => Some(self.solar_ft_1mwp.as_str()),
            SolarMode::Sat => Some(self.solar_sat_1mwp.as_str()),
            SolarMode::Ew => Some(self.solar_ew_1mwp.as_str()),
        }
    }
}

// ── Engine configs ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub sheet: String,
    pub scan_rows: usize,
    pub title_lookback: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            sheet: "Data".to_string(),
            scan_rows: DEFAULT_SCAN_ROWS,
            title_lookback: DEFAULT_TITLE_LOOKBACK,
        }
    }
}

/// Everything the netting engine needs besides the model table and sizing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NettingConfig {
    pub calendar: Calendar,
    pub tod: TodScheme,
    pub storage: StorageConfig,
    pub tariffs: TariffRates,
    pub columns: ColumnMap,
}

impl NettingConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: NettingConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.calendar.validate()?;
        self.tod.validate()?;
        self.storage.validate()?;
        self.tariffs.validate()
    }
}

/// Top-level settings file: `[extraction]`, `[netting]`, `[sizing]`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub extraction: ExtractionConfig,
    pub netting: NettingConfig,
    pub sizing: Sizing,
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.netting.validate()?;
        config.sizing.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
