//! Crate-level error type.

use thiserror::Error;

use crate::expr::ExprError;
use crate::planner::PlanError;
use crate::reorder::ReorderError;
use crate::statistics::StatisticsError;

/// Result type for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the public API.
#[derive(Debug, Error)]
pub enum Error {
    #[error("expression error: {0}")]
    Expr(#[from] ExprError),

    #[error("plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("reorder error: {0}")]
    Reorder(#[from] ReorderError),

    #[error("statistics error: {0}")]
    Statistics(#[from] StatisticsError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
