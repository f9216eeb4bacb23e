//! Statistics errors.

use thiserror::Error;

/// Result type for statistics operations.
pub type StatisticsResult<T> = Result<T, StatisticsError>;

/// Statistics errors.
#[derive(Debug, Error)]
pub enum StatisticsError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("empty histogram document")]
    Empty,

    #[error("invalid histogram: {0}")]
    InvalidHistogram(String),
}
