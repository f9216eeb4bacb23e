//! Logical plan model.
//!
//! Plans are immutable trees of [`Plan`] nodes shared through `Arc`, so a
//! rewrite builds replacement nodes and leaves the original tree intact for
//! the other alternatives that reference it.

mod error;
pub mod eval;
mod logical;

pub use error::{PlanError, PlanResult};
pub use eval::Dataset;
pub use logical::{JoinType, Plan};
