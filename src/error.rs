use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("[{context}] Missing columns: {missing:?}. Available: {available:?}")]
    MissingColumn {
        context: String,
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("Unknown {kind} labels: {labels:?}. Expected one of {expected:?}")]
    UnknownLabel {
        kind: &'static str,
        labels: Vec<String>,
        expected: Vec<String>,
    },

    #[error("Structural parse error ({location}): {message}")]
    StructuralParse { location: String, message: String },

    #[error("Sheet '{sheet}' not found. Available sheets: {available:?}")]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("InvalidData: {0}")]
    InvalidData(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Structural failure tied to a block's header row.
    pub fn at_block(header_row: usize, message: impl Into<String>) -> Self {
        EngineError::StructuralParse {
            location: format!("block with header at row {header_row}"),
            message: message.into(),
        }
    }
}

#[cfg(feature = "python")]
impl From<EngineError> for pyo3::PyErr {
    fn from(err: EngineError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyKeyError, PyRuntimeError, PyValueError};
        match &err {
            EngineError::MissingColumn { .. } => PyKeyError::new_err(err.to_string()),
            EngineError::UnknownLabel { .. }
            | EngineError::InvalidConfig(_)
            | EngineError::InvalidData(_)
            | EngineError::StructuralParse { .. } => PyValueError::new_err(err.to_string()),
            _ => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
