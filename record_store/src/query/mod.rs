//! Query criteria
//!
//! Criteria callbacks receive a [`SelectQuery`] or [`DeleteQuery`] and refine
//! the statement the operation is about to run.

pub mod delete;
pub mod filter;
pub mod ordering;
pub mod select;

#[cfg(test)]
mod tests;

pub use delete::DeleteQuery;
pub use filter::QueryOperator;
pub use ordering::SortOrder;
pub use select::{RowLock, SelectQuery};
