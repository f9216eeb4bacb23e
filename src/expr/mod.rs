//! Expression identity and expression trees.
//!
//! Every column produced anywhere in a plan carries an [`ExprId`]. Slots refer
//! to columns by that id; named expressions define new ids.

mod error;
mod expression;
mod id;
mod slot;

pub use error::{ExprError, ExprResult};
pub use expression::{BinaryOperator, Expression, Literal, Row};
pub use id::{ExprId, ExprIdAllocator};
pub use slot::{NamedExpression, Slot};
