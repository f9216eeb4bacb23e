//! Expression evaluation errors.

use thiserror::Error;

use super::id::ExprId;

/// Result type for expression operations.
pub type ExprResult<T> = Result<T, ExprError>;

/// Expression evaluation errors.
#[derive(Debug, Clone, Error)]
pub enum ExprError {
    #[error("slot {0} is not bound in the input row")]
    UnboundSlot(ExprId),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("division by zero")]
    DivisionByZero,
}
