use std::fmt;
use std::str::FromStr;

use polars::prelude::*;
use serde::Deserialize;

use crate::error::{EngineError, Result};
use crate::schema::keys;

/// Time-of-day band used for netting and tariffs.
///
/// Declaration order is the reporting order (A, C, B, D), which follows the
/// clock rather than the letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub enum TodSlot {
    A,
    C,
    B,
    D,
}

impl TodSlot {
    pub const ORDER: [TodSlot; 4] = [TodSlot::A, TodSlot::C, TodSlot::B, TodSlot::D];

    pub fn label(self) -> &'static str {
        match self {
            TodSlot::A => "A",
            TodSlot::C => "C",
            TodSlot::B => "B",
            TodSlot::D => "D",
        }
    }

    /// Position in [`TodSlot::ORDER`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TodSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TodSlot {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(TodSlot::A),
            "C" => Ok(TodSlot::C),
            "B" => Ok(TodSlot::B),
            "D" => Ok(TodSlot::D),
            _ => Err(EngineError::UnknownLabel {
                kind: "time-of-day slot",
                labels: vec![s.to_string()],
                expected: TodSlot::ORDER.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }
}

impl TryFrom<String> for TodSlot {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Slot boundaries as half-open hour intervals:
/// A = [0, c_start), C = [c_start, b_start), B = [b_start, d_start),
/// D = [d_start, 24).
///
/// This is the only hour -> slot mapping in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TodScheme {
    pub c_start: u32,
    pub b_start: u32,
    pub d_start: u32,
}

impl Default for TodScheme {
    fn default() -> Self {
        Self {
            c_start: 6,
            b_start: 9,
            d_start: 17,
        }
    }
}

impl TodScheme {
    pub fn validate(&self) -> Result<()> {
        if 0 < self.c_start
            && self.c_start < self.b_start
            && self.b_start < self.d_start
            && self.d_start < 24
        {
            Ok(())
        } else {
            Err(EngineError::InvalidConfig(format!(
                "slot boundaries must satisfy 0 < C < B < D < 24, got C={} B={} D={}",
                self.c_start, self.b_start, self.d_start
            )))
        }
    }

    pub fn slot_for_hour(&self, hour: u32) -> Result<TodSlot> {
        match hour {
            h if h < self.c_start => Ok(TodSlot::A),
            h if h < self.b_start => Ok(TodSlot::C),
            h if h < self.d_start => Ok(TodSlot::B),
            h if h < 24 => Ok(TodSlot::D),
            h => Err(EngineError::UnknownLabel {
                kind: "hour",
                labels: vec![h.to_string()],
                expected: vec!["0..=23".to_string()],
            }),
        }
    }

    /// Number of hours per day that fall in `slot`.
    pub fn hours_in(&self, slot: TodSlot) -> u32 {
        match slot {
            TodSlot::A => self.c_start,
            TodSlot::C => self.b_start - self.c_start,
            TodSlot::B => self.d_start - self.b_start,
            TodSlot::D => 24 - self.d_start,
        }
    }

    /// Lookup frame `hour | tod_slot | slot_idx`, one row per hour of the day.
    pub fn hour_frame(&self) -> Result<DataFrame> {
        let mut hours: Vec<i32> = Vec::with_capacity(24);
        let mut slots: Vec<&str> = Vec::with_capacity(24);
        let mut order: Vec<u32> = Vec::with_capacity(24);
        for hour in 0..24u32 {
            let slot = self.slot_for_hour(hour)?;
            hours.push(hour as i32);
            slots.push(slot.label());
            order.push(slot.index() as u32);
        }

        let df = DataFrame::new(vec![
            Column::new(keys::HOUR.into(), &hours),
            Column::new(keys::TOD_SLOT.into(), &slots),
            Column::new(keys::SLOT_IDX.into(), &order),
        ])?;
        Ok(df)
    }
}
