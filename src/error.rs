use thiserror::Error;

/// A geometry cell that could not be turned into a province boundary.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("malformed geometry on row {row}: {reason}")]
pub struct MalformedGeometryError {
    /// 1-based data row (header excluded).
    pub row: usize,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Render error: {0}")]
    Render(String),

    #[error("required column '{0}' is missing from the dataset")]
    MissingColumn(String),

    #[error("invalid value '{value}' in column '{column}' on row {row}: expected a non-negative integer")]
    InvalidMetric {
        row: usize,
        column: String,
        value: String,
    },

    #[error(transparent)]
    MalformedGeometry(#[from] MalformedGeometryError),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
