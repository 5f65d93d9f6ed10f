//! Convenience re-exports for common record-store usage
//!
//! ```rust,ignore
//! use record_store::prelude::*;
//! ```

pub use crate::errors::{Operation, StoreError};
pub use crate::handle::{trx, Handle};
pub use crate::hooks::{
    after_fn, before_fn, local_parameters, timestamps, Hook, LocalParameters, SharedHook,
    Timestamps,
};
pub use crate::ops::{self, DeleteCriteria};
pub use crate::query::{DeleteQuery, QueryOperator, SelectQuery, SortOrder};
pub use crate::record::{validate_record, Record};
pub use crate::relation::{Cascade, Relation, RelationKind};
pub use crate::store::{ScopedStore, Store, StoreHooks};

pub use record_derive::{model, Record};

pub use async_trait::async_trait;
pub use chrono::{DateTime, Utc};
pub use sqlx::{FromRow, PgConnection, PgPool, Postgres, Transaction};
pub use uuid::Uuid;
