//! Join reorder errors.

use thiserror::Error;

use crate::planner::PlanError;

/// Result type for reorder operations.
pub type ReorderResult<T> = Result<T, ReorderError>;

/// Join reorder errors.
#[derive(Debug, Clone, Error)]
pub enum ReorderError {
    /// A top join conjunct only touches relations already joined below it.
    /// Such a conjunct should have been pushed down before reordering.
    #[error("{rule}: conjunct {conjunct} only references relations joined below it")]
    MisplacedConjunct { rule: &'static str, conjunct: String },

    #[error("{rule} produced an invalid plan: {source}")]
    InvalidRewrite {
        rule: &'static str,
        #[source]
        source: PlanError,
    },
}
