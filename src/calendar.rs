use polars::prelude::*;
use serde::Deserialize;

use crate::error::{EngineError, Result};
use crate::schema::keys;

/// Month labels in calendar order. Sorting is always by position here,
/// never alphabetical.
pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Calendar position of a month label, case-insensitive.
pub fn month_index(label: &str) -> Option<usize> {
    let label = label.trim();
    MONTHS.iter().position(|m| m.eq_ignore_ascii_case(label))
}

/// Canonical spelling (`"jan"` -> `"Jan"`).
pub fn canonical_month(label: &str) -> Option<&'static str> {
    month_index(label).map(|i| MONTHS[i])
}

/// Day count per month used to turn a typical day into a month.
///
/// Fixed table without leap years: the reference workbook multiplies
/// February by 28 every year.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Calendar {
    pub days: [u32; 12],
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            days: [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31],
        }
    }
}

impl Calendar {
    pub fn validate(&self) -> Result<()> {
        for (month, &days) in MONTHS.iter().zip(self.days.iter()) {
            if days == 0 || days > 31 {
                return Err(EngineError::InvalidConfig(format!(
                    "calendar: {month} has {days} days"
                )));
            }
        }
        Ok(())
    }

    pub fn days_in(&self, month: &str) -> Option<u32> {
        MONTHS
            .iter()
            .position(|m| *m == month)
            .map(|i| self.days[i])
    }

    pub fn days_in_year(&self) -> u32 {
        self.days.iter().sum()
    }

    /// Lookup frame `month | month_idx | days` joined onto hourly tables.
    pub fn lookup_frame(&self) -> Result<DataFrame> {
        let idx: Vec<u32> = (0..MONTHS.len() as u32).collect();
        let df = DataFrame::new(vec![
            Column::new(keys::MONTH.into(), &MONTHS),
            Column::new(keys::MONTH_IDX.into(), &idx),
            Column::new(keys::DAYS.into(), &self.days),
        ])?;
        Ok(df)
    }
}
