//! # record-store
//!
//! Typed data access for PostgreSQL records on top of `sqlx`.
//!
//! Records declare their table, columns, primary key and relations with
//! `#[derive(Record)]` (or `#[model]`). The [`ops`] functions read and write
//! them with consistent transaction and hook semantics; [`Store`] binds the
//! same operations to one entity/record pair.
//!
//! ```rust,ignore
//! use record_store::prelude::*;
//!
//! #[model]
//! #[record(table = "test_models", alias = "test_model")]
//! pub struct TestModel {
//!     #[primary_key]
//!     pub id: String,
//!     pub name: String,
//!
//!     #[relation(has_one, join = "id=test_model_id", persist)]
//!     pub related: Option<TestRelated>,
//! }
//!
//! let mut model = TestModel { id: "a".into(), name: "x".into(), related: None };
//! ops::create(&pool, &mut model, &[], &[]).await?;
//!
//! let found = ops::find_by_id::<TestModel, _, _>(&pool, "a", |q| {
//!     q.relation("related");
//! })
//! .await?;
//! ```

// Generated code refers to `::record_store::...`, also from inside this crate.
extern crate self as record_store;

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod errors;
pub mod handle;
pub mod hooks;
pub mod ops;
pub mod prelude;
pub mod query;
pub mod record;
pub mod relation;
pub mod store;
pub mod validation;

#[cfg(test)]
mod test_models;

pub use errors::{Operation, StoreError};
pub use handle::{trx, Handle};
pub use hooks::Hook;
pub use query::{DeleteQuery, QueryOperator, SelectQuery, SortOrder};
pub use record::{validate_record, Record};
pub use relation::{Cascade, Relation};
pub use store::{ScopedStore, Store, StoreHooks};

pub use record_derive::{model, Record};

// Re-exported for generated code and callers.
pub use chrono;
pub use sqlx;
