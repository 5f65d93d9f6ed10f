//! Lifecycle hooks
//!
//! A before-hook runs inside the write's transaction and may abort it; an
//! after-hook runs once the write has committed and cannot change the
//! outcome. Hooks run in list order.

pub mod local_parameter;
pub mod timestamps;

use crate::errors::{Operation, StoreError};
use crate::record::Record;
use async_trait::async_trait;
use futures::future::BoxFuture;
use sqlx::PgConnection;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

pub use local_parameter::{local_parameters, LocalParameters};
pub use timestamps::{timestamps, Timestamps};

/// Named callbacks around a write of `M`.
#[async_trait]
pub trait Hook<M: Record>: Send + Sync {
    fn name(&self) -> &str;

    /// Runs before the statement, on the write's transaction. An error aborts
    /// the write and rolls the transaction back.
    async fn before(&self, _conn: &mut PgConnection, _record: &mut M) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs after commit. A failure is logged and does not change the
    /// write's outcome.
    async fn after(&self, _record: &M) -> anyhow::Result<()> {
        Ok(())
    }
}

pub type SharedHook<M> = Arc<dyn Hook<M>>;

impl<M: Record> fmt::Debug for dyn Hook<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hook").field(&self.name()).finish()
    }
}

/// Before-hook backed by a closure.
pub struct BeforeFn<M, F> {
    name: String,
    f: F,
    _record: PhantomData<fn(M)>,
}

/// Wrap `f` as a before-hook.
///
/// ```rust,ignore
/// let reject_empty = before_fn("reject_empty", |_conn, model: &mut TestModel| {
///     Box::pin(async move {
///         anyhow::ensure!(!model.name.is_empty(), "name is required");
///         Ok(())
///     })
/// });
/// ```
pub fn before_fn<M, F>(name: impl Into<String>, f: F) -> SharedHook<M>
where
    M: Record,
    F: for<'c> Fn(&'c mut PgConnection, &'c mut M) -> BoxFuture<'c, anyhow::Result<()>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(BeforeFn {
        name: name.into(),
        f,
        _record: PhantomData,
    })
}

#[async_trait]
impl<M, F> Hook<M> for BeforeFn<M, F>
where
    M: Record,
    F: for<'c> Fn(&'c mut PgConnection, &'c mut M) -> BoxFuture<'c, anyhow::Result<()>>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn before(&self, conn: &mut PgConnection, record: &mut M) -> anyhow::Result<()> {
        (self.f)(conn, record).await
    }
}

/// After-hook backed by a closure.
pub struct AfterFn<M, F> {
    name: String,
    f: F,
    _record: PhantomData<fn(M)>,
}

/// Wrap `f` as an after-hook.
pub fn after_fn<M, F>(name: impl Into<String>, f: F) -> SharedHook<M>
where
    M: Record,
    F: Fn(&M) + Send + Sync + 'static,
{
    Arc::new(AfterFn {
        name: name.into(),
        f,
        _record: PhantomData,
    })
}

#[async_trait]
impl<M, F> Hook<M> for AfterFn<M, F>
where
    M: Record,
    F: Fn(&M) + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn after(&self, record: &M) -> anyhow::Result<()> {
        (self.f)(record);
        Ok(())
    }
}

/// Run before-hooks in order, stopping at the first failure.
pub(crate) async fn run_before<M: Record>(
    operation: Operation,
    hooks: &[SharedHook<M>],
    conn: &mut PgConnection,
    record: &mut M,
) -> Result<(), StoreError> {
    for hook in hooks {
        crate::trace_log!(hook = hook.name(), %operation, "running before hook");
        hook.before(&mut *conn, &mut *record)
            .await
            .map_err(|e| StoreError::Hook {
                operation,
                hook: hook.name().to_string(),
                source: e.into(),
            })?;
    }
    Ok(())
}

pub(crate) async fn run_after<M: Record>(hooks: &[SharedHook<M>], record: &M) {
    for hook in hooks {
        crate::trace_log!(hook = hook.name(), "running after hook");
        if let Err(e) = hook.after(record).await {
            tracing::warn!(
                hook = hook.name(),
                table = M::table_name(),
                error = %e,
                "after hook failed"
            );
        }
    }
}
