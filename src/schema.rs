/// Column-name constants for the netting tables.
/// Single source of truth - exported to Python via PyO3.

// ── Key columns ─────────────────────────────────────────────────────────────
pub mod keys {
    pub const MONTH: &str = "month";
    pub const HOUR: &str = "hour";
    pub const MONTH_IDX: &str = "month_idx";
    pub const DAYS: &str = "days";
    pub const TOD_SLOT: &str = "tod_slot";
    pub const SLOT_IDX: &str = "slot_idx";

    pub const ALL: [&str; 2] = [MONTH, HOUR];
}

// ── Canonical reference columns (per 1 MW / 1 MWp) ─────────────────────────
pub mod reference {
    pub const LOAD_1MW: &str = "load_1mw";
    pub const WIND_1MW: &str = "wind_generation_reference_for_1_mw";
    pub const SOLAR_FT_1MWP: &str = "160_ft_solar_generation_reference_for_1_mwp";
    pub const SOLAR_SAT_1MWP: &str = "sat_solar_generation_reference_for_1_mwp";
    pub const SOLAR_EW_1MWP: &str = "ew_solar_generation_reference_for_1_mwp";
}

// ── Hourly power columns (kW) ───────────────────────────────────────────────
pub mod power {
    pub const LOAD_KW: &str = "load_kw";
    pub const SOLAR_KW: &str = "solar_kw";
    pub const WIND_KW: &str = "wind_kw";
}

// ── Energy columns (kWh) ────────────────────────────────────────────────────
pub mod energy {
    pub const LOAD_KWH: &str = "load_kwh";
    pub const SOLAR_KWH: &str = "solar_kwh";
    pub const WIND_KWH: &str = "wind_kwh";
    pub const TOTAL_RE_KWH: &str = "total_re_kwh";
    pub const SURPLUS_KWH: &str = "surplus_kwh";
    pub const STORAGE_KWH: &str = "storage_kwh";
    pub const GRID_PRE_STORAGE_KWH: &str = "grid_pre_storage_kwh";
    pub const GRID_KWH: &str = "grid_kwh";

    /// Summed when month-slot rows are annualised.
    pub const ANNUAL_SUMS: [&str; 6] = [
        LOAD_KWH,
        SOLAR_KWH,
        WIND_KWH,
        TOTAL_RE_KWH,
        SURPLUS_KWH,
        GRID_PRE_STORAGE_KWH,
    ];
}

// ── Share columns (%) ───────────────────────────────────────────────────────
pub mod share {
    pub const RE_PERCENT: &str = "re_percent";
}

// ── Rate columns (₹/kWh) ────────────────────────────────────────────────────
pub mod rates {
    pub const SOLAR_RATE: &str = "solar_rate";
    pub const WIND_RATE: &str = "wind_rate";
    pub const STORAGE_RATE: &str = "storage_rate";
    pub const GRID_RATE: &str = "grid_rate";
}

// ── Cost columns (₹) ────────────────────────────────────────────────────────
pub mod costs {
    pub const SOLAR_COST_RS: &str = "solar_cost_rs";
    pub const WIND_COST_RS: &str = "wind_cost_rs";
    pub const STORAGE_COST_RS: &str = "storage_cost_rs";
    pub const GRID_COST_RS: &str = "grid_cost_rs";
    pub const TOTAL_COST_RS: &str = "total_cost_rs";
}

/// Label of the synthetic summary row in the annual table.
pub const TOTAL_LABEL: &str = "Total";
