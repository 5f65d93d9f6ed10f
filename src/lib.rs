//! # svc-common
//!
//! Shared building blocks for Postgres-backed services.
//!
//! The data-access layer lives in [`record_store`]: generic reads and writes
//! over `#[model]` records, related-record cascades, lifecycle hooks, and a
//! typed [`record_store::Store`] mapping domain entities to records. This
//! crate adds the infrastructure around it: pool setup, logging, date and
//! clock helpers, and re-exports of the sibling crates.
//!
//! ```rust,no_run
//! use svc_common::prelude::*;
//!
//! #[model]
//! #[record(table = "users")]
//! pub struct User {
//!     #[primary_key]
//!     pub id: Uuid,
//!     pub name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     svc_common::logging::init(&LoggingConfig::from_env());
//!     let pool = svc_common::db::connect(&DatabaseConfig::from_env()?).await?;
//!
//!     let mut user = User { id: Uuid::new_v4(), name: "Ada".to_string() };
//!     ops::create(&pool, &mut user, &[], &[]).await?;
//!
//!     let found: User = ops::find_by_id(&pool, user.id, |_| {}).await?;
//!     tracing::info!(name = %found.name, "created user");
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod date;
pub mod db;
pub mod errors;
pub mod filelog;
pub mod logging;
pub mod prelude;

pub use errors::{DateError, InfraError};

pub use config;
pub use errs;
pub use http_request;
pub use pubsub;
pub use record_store;

pub use anyhow;
pub use async_trait;
pub use sqlx;
