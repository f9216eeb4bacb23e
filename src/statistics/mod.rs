//! Column statistics consumed by the cost model.
//!
//! The reorder rules never read these; they are carried by the compilation
//! session so a cost model can score the alternatives the rules produce.

mod error;
mod histogram;
mod store;

pub use error::{StatisticsError, StatisticsResult};
pub use histogram::{Bucket, DataType, Histogram};
pub use store::{ColumnKey, StatisticsStore};
