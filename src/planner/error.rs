//! Planning errors.

use thiserror::Error;

use crate::expr::{ExprError, ExprId};

/// Result type for planning operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// Plan construction and evaluation errors.
#[derive(Debug, Clone, Error)]
pub enum PlanError {
    #[error("expression id {0} is defined more than once in the plan")]
    DuplicateExprId(ExprId),

    #[error("{node} references {slot} which no child produces")]
    UnresolvedSlot { node: &'static str, slot: String },

    #[error("unknown relation: {0}")]
    UnknownRelation(String),

    #[error("relation {relation} expects {expected} columns per row, got {actual}")]
    ArityMismatch {
        relation: String,
        expected: usize,
        actual: usize,
    },

    #[error("expression error: {0}")]
    Expr(#[from] ExprError),
}
