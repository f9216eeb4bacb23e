//! Join reordering.
//!
//! [`utils`] holds the set arithmetic that keeps projections and conjuncts on
//! the correct side of a rotated join; [`rules`] uses it to implement the
//! individual rewrites and [`JoinReorderer`] applies those rules across a
//! plan to enumerate alternatives.

mod error;
mod explorer;
pub mod rules;
pub mod utils;

pub use error::{ReorderError, ReorderResult};
pub use explorer::JoinReorderer;
pub use rules::{JoinCommute, JoinExchange, JoinLeftAssociate, JoinRightAssociate, ReorderRule};
pub use utils::{
    add_slots_used_by_on, is_all_slot_project, join_child_condition_slots, new_project,
    project_or_self, project_or_self_in_order, split_conjuncts, split_project, ConjunctSplit,
};
