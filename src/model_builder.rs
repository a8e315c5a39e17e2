use std::collections::HashSet;

use polars::prelude::*;
use tracing::{info, warn};

use crate::calendar::Calendar;
use crate::error::{EngineError, Result};
use crate::schema::keys;
use crate::tod::TodScheme;

/// Wide hourly table keyed by (`month`, `hour`), one f64 column per
/// canonical field. Normally 12 × 24 = 288 rows.
#[derive(Debug, Clone)]
pub struct ModelTable {
    frame: DataFrame,
}

impl ModelTable {
    /// Wrap an existing frame. Requires `month` and `hour` columns; `hour` is
    /// cast to i32.
    pub fn try_from_frame(frame: DataFrame) -> Result<Self> {
        require_columns(&frame, &keys::ALL, "model table")?;
        let frame = frame
            .lazy()
            .with_columns([col(keys::HOUR).cast(DataType::Int32)])
            .collect()?;
        Ok(Self { frame })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Canonical field columns, excluding keys and derived columns.
    pub fn value_columns(&self) -> Vec<String> {
        self.frame
            .get_column_names_str()
            .iter()
            .filter(|c| ![keys::MONTH, keys::HOUR, keys::DAYS, keys::TOD_SLOT].contains(c))
            .map(|c| c.to_string())
            .collect()
    }

    /// Copy of the table with `days` and `tod_slot` appended.
    pub fn with_derived_columns(&self, calendar: &Calendar, scheme: &TodScheme) -> Result<ModelTable> {
        let base: Vec<Expr> = self
            .frame
            .get_column_names_str()
            .into_iter()
            .filter(|c| *c != keys::DAYS && *c != keys::TOD_SLOT)
            .map(col)
            .collect();
        let mut out = base.clone();
        out.push(col(keys::DAYS));
        out.push(col(keys::TOD_SLOT));

        let frame = self
            .frame
            .clone()
            .lazy()
            .select(base)
            .join(
                calendar.lookup_frame()?.lazy(),
                [col(keys::MONTH)],
                [col(keys::MONTH)],
                JoinArgs::new(JoinType::Left),
            )
            .join(
                scheme.hour_frame()?.lazy(),
                [col(keys::HOUR)],
                [col(keys::HOUR)],
                JoinArgs::new(JoinType::Left),
            )
            .sort_by_exprs(
                [col(keys::MONTH_IDX), col(keys::HOUR)],
                SortMultipleOptions::default(),
            )
            .select(out)
            .collect()?;
        Ok(ModelTable { frame })
    }
}

/// Fail with every missing column named, plus what is available.
pub fn require_columns(df: &DataFrame, required: &[&str], context: &str) -> Result<()> {
    let schema = df.schema();
    let missing: Vec<String> = required
        .iter()
        .filter(|c| !schema.contains(c))
        .map(|c| c.to_string())
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(EngineError::MissingColumn {
        context: context.to_string(),
        missing,
        available: df
            .get_column_names_str()
            .iter()
            .map(|c| c.to_string())
            .collect(),
    })
}

/// Merge per-block long series into one wide table.
///
/// The first series provides the (month, hour) backbone and every series is
/// left-joined onto it. This merge is lossy by design: pairs missing from
/// the backbone are dropped and pairs missing from a later series become
/// 0.0, without raising.
pub fn build_model_table(series: &[DataFrame], names: &[String]) -> Result<ModelTable> {
    if series.len() != names.len() {
        return Err(EngineError::InvalidData(format!(
            "blocks and block names length mismatch: {} series, {} names",
            series.len(),
            names.len()
        )));
    }
    let Some(first) = series.first() else {
        return Err(EngineError::InvalidData("no block series to merge".into()));
    };

    let mut unique = HashSet::new();
    for name in names {
        if keys::ALL.contains(&name.as_str()) || !unique.insert(name.as_str()) {
            return Err(EngineError::InvalidData(format!(
                "block name '{name}' is a key column or duplicated"
            )));
        }
    }

    require_columns(first, &keys::ALL, "block 0")?;
    let backbone_rows = first.height();
    let mut lazy = first
        .clone()
        .lazy()
        .select([col(keys::MONTH), col(keys::HOUR).cast(DataType::Int32)]);

    for (i, (df, name)) in series.iter().zip(names).enumerate() {
        require_columns(df, &keys::ALL, &format!("block {i}"))?;
        let value_cols: Vec<&str> = df
            .get_column_names_str()
            .into_iter()
            .filter(|c| !keys::ALL.contains(c))
            .collect();
        let [value_col] = value_cols.as_slice() else {
            return Err(EngineError::InvalidData(format!(
                "expected exactly 1 value column in block {i}, got {value_cols:?}"
            )));
        };
        if df.height() != backbone_rows {
            warn!(
                block = i,
                name = name.as_str(),
                rows = df.height(),
                backbone_rows,
                "block does not match the backbone; unmatched pairs are dropped or zero-filled"
            );
        }

        let right = df.clone().lazy().select([
            col(keys::MONTH),
            col(keys::HOUR).cast(DataType::Int32),
            col(*value_col).alias(name.as_str()),
        ]);
        lazy = lazy.join(
            right,
            [col(keys::MONTH), col(keys::HOUR)],
            [col(keys::MONTH), col(keys::HOUR)],
            JoinArgs::new(JoinType::Left),
        );
    }

    let mut out: Vec<Expr> = vec![col(keys::MONTH), col(keys::HOUR)];
    out.extend(names.iter().map(|n| {
        col(n.as_str())
            .cast(DataType::Float64)
            .fill_null(lit(0.0))
            .alias(n.as_str())
    }));

    let frame = lazy
        .join(
            Calendar::default().lookup_frame()?.lazy(),
            [col(keys::MONTH)],
            [col(keys::MONTH)],
            JoinArgs::new(JoinType::Left),
        )
        .sort_by_exprs(
            [col(keys::MONTH_IDX), col(keys::HOUR)],
            SortMultipleOptions::default().with_nulls_last(true),
        )
        .select(out)
        .collect()?;

    info!(
        rows = frame.height(),
        columns = names.len(),
        "model table built"
    );
    Ok(ModelTable { frame })
}
