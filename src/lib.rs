//! Joinrewrite - join reorder rewrites for a cost-based SQL optimizer
//!
//! This crate provides the rewrite core of a join reorderer. Plans are
//! immutable trees whose columns are identified by [`expr::ExprId`]; the
//! rules in [`reorder`] rotate join trees while keeping every projection and
//! every join conjunct on the side of the tree that can see its inputs.
//!
//! # Example
//!
//! ```
//! use joinrewrite::config::ReorderConfig;
//! use joinrewrite::expr::{Expression, Slot};
//! use joinrewrite::planner::Plan;
//! use joinrewrite::session::CompilationSession;
//!
//! let session = CompilationSession::new(ReorderConfig::default());
//! let ids = session.allocator();
//!
//! let a = Plan::leaf("a", vec![Slot::qualified(ids.next(), "a", "id")]);
//! let b = Plan::leaf("b", vec![Slot::qualified(ids.next(), "b", "a_id")]);
//! let on = Expression::equals(
//!     Expression::slot(&a.output()[0]),
//!     Expression::slot(&b.output()[0]),
//! );
//! let plan = Plan::inner_join(a, b, vec![on]);
//!
//! let alternatives = session.explore(&plan).unwrap();
//! assert!(!alternatives.is_empty());
//! ```

pub mod config;
pub mod error;
pub mod expr;
pub mod planner;
pub mod reorder;
pub mod session;
pub mod statistics;

pub use config::ReorderConfig;
pub use error::{Error, Result};
pub use reorder::JoinReorderer;
pub use session::CompilationSession;
