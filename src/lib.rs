pub mod annual;
pub mod blocks;
pub mod calendar;
pub mod config;
pub mod error;
pub mod grid;
pub mod loader;
pub mod logging;
pub mod model_builder;
pub mod naming;
pub mod netting;
pub mod schema;
pub mod timeseries;
pub mod tod;

#[cfg(feature = "python")]
mod model;

pub use annual::{AnnualRow, AnnualTable, KpiSummary};
pub use blocks::Block;
pub use config::{Config, NettingConfig, Sizing, SolarMode, SolarModel};
pub use error::{EngineError, Result};
pub use grid::RawGrid;
pub use loader::{load_model_table, load_model_table_from_grid};
pub use model_builder::ModelTable;
pub use naming::NameMapper;
pub use netting::{MonthSlotRow, NettingEngine, NettingResult};
pub use tod::{TodScheme, TodSlot};

#[cfg(feature = "python")]
mod python {
    use pyo3::prelude::*;
    use pyo3::types::PyModule;

    use crate::model::{list_sheets, NettingModel};
    use crate::schema;

    /// Export schema constants as Python submodules
    fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
        // Keys
        let keys = PyModule::new(m.py(), "keys")?;
        keys.add("MONTH", schema::keys::MONTH)?;
        keys.add("HOUR", schema::keys::HOUR)?;
        keys.add("DAYS", schema::keys::DAYS)?;
        keys.add("TOD_SLOT", schema::keys::TOD_SLOT)?;
        m.add_submodule(&keys)?;

        // Reference profiles
        let reference = PyModule::new(m.py(), "reference")?;
        reference.add("LOAD_1MW", schema::reference::LOAD_1MW)?;
        reference.add("WIND_1MW", schema::reference::WIND_1MW)?;
        reference.add("SOLAR_FT_1MWP", schema::reference::SOLAR_FT_1MWP)?;
        reference.add("SOLAR_SAT_1MWP", schema::reference::SOLAR_SAT_1MWP)?;
        reference.add("SOLAR_EW_1MWP", schema::reference::SOLAR_EW_1MWP)?;
        m.add_submodule(&reference)?;

        // Energy
        let energy = PyModule::new(m.py(), "energy")?;
        energy.add("LOAD_KWH", schema::energy::LOAD_KWH)?;
        energy.add("SOLAR_KWH", schema::energy::SOLAR_KWH)?;
        energy.add("WIND_KWH", schema::energy::WIND_KWH)?;
        energy.add("TOTAL_RE_KWH", schema::energy::TOTAL_RE_KWH)?;
        energy.add("SURPLUS_KWH", schema::energy::SURPLUS_KWH)?;
        energy.add("STORAGE_KWH", schema::energy::STORAGE_KWH)?;
        energy.add(
            "GRID_PRE_STORAGE_KWH",
            schema::energy::GRID_PRE_STORAGE_KWH,
        )?;
        energy.add("GRID_KWH", schema::energy::GRID_KWH)?;
        m.add_submodule(&energy)?;

        // Share
        let share = PyModule::new(m.py(), "share")?;
        share.add("RE_PERCENT", schema::share::RE_PERCENT)?;
        m.add_submodule(&share)?;

        // Rates
        let rates = PyModule::new(m.py(), "rates")?;
        rates.add("SOLAR_RATE", schema::rates::SOLAR_RATE)?;
        rates.add("WIND_RATE", schema::rates::WIND_RATE)?;
        rates.add("STORAGE_RATE", schema::rates::STORAGE_RATE)?;
        rates.add("GRID_RATE", schema::rates::GRID_RATE)?;
        m.add_submodule(&rates)?;

        // Costs
        let costs = PyModule::new(m.py(), "costs")?;
        costs.add("SOLAR_COST_RS", schema::costs::SOLAR_COST_RS)?;
        costs.add("WIND_COST_RS", schema::costs::WIND_COST_RS)?;
        costs.add("STORAGE_COST_RS", schema::costs::STORAGE_COST_RS)?;
        costs.add("GRID_COST_RS", schema::costs::GRID_COST_RS)?;
        costs.add("TOTAL_COST_RS", schema::costs::TOTAL_COST_RS)?;
        m.add_submodule(&costs)?;

        m.add("TOTAL_LABEL", schema::TOTAL_LABEL)?;
        Ok(())
    }

    #[pymodule]
    fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
        crate::logging::init_tracing("tod_netting=info");
        m.add_class::<NettingModel>()?;
        m.add_function(wrap_pyfunction!(list_sheets, m)?)?;
        add_schema_exports(m)?;
        Ok(())
    }
}
