//! Database handles and transaction scoping
//!
//! Every operation accepts anything convertible into a [`Handle`]: the pool
//! or a caller's connection. Writes join the connection's open transaction
//! and otherwise begin and commit their own, so calls nested inside hooks
//! never begin or commit a second one.

use crate::errors::StoreError;
use futures::future::BoxFuture;
use sqlx::pool::PoolConnection;
use sqlx::{Connection, PgConnection, PgPool, Postgres, Transaction};

/// Where a statement runs.
#[derive(Debug)]
pub enum Handle<'a> {
    /// The pool; writes begin and commit their own transaction.
    Root(&'a PgPool),
    /// A caller's connection, usually inside a transaction the caller owns.
    Transaction(&'a mut PgConnection),
}

impl Handle<'_> {
    /// Whether the connection has a transaction open right now.
    pub fn is_in_transaction(&self) -> bool {
        match self {
            Handle::Root(_) => false,
            Handle::Transaction(conn) => conn.is_in_transaction(),
        }
    }

    /// Shorter-lived handle to the same pool or connection.
    pub fn reborrow(&mut self) -> Handle<'_> {
        match self {
            Handle::Root(pool) => Handle::Root(*pool),
            Handle::Transaction(conn) => Handle::Transaction(&mut **conn),
        }
    }
}

impl<'a> From<&'a PgPool> for Handle<'a> {
    fn from(pool: &'a PgPool) -> Self {
        Handle::Root(pool)
    }
}

impl<'a> From<&'a mut PgConnection> for Handle<'a> {
    fn from(conn: &'a mut PgConnection) -> Self {
        Handle::Transaction(conn)
    }
}

impl<'a> From<&'a mut Transaction<'_, Postgres>> for Handle<'a> {
    fn from(tx: &'a mut Transaction<'_, Postgres>) -> Self {
        Handle::Transaction(&mut **tx)
    }
}

impl<'a, 'b> From<&'a mut Handle<'b>> for Handle<'a> {
    fn from(handle: &'a mut Handle<'b>) -> Self {
        handle.reborrow()
    }
}

/// Transaction a write runs in.
pub(crate) enum Scope<'a> {
    /// Opened here; committed by [`Scope::commit`], rolled back on drop.
    Owned(Transaction<'a, Postgres>),
    /// Joined; the caller commits.
    Joined(&'a mut PgConnection),
}

impl<'a> Scope<'a> {
    pub(crate) async fn begin(handle: Handle<'a>) -> Result<Self, StoreError> {
        match handle {
            Handle::Root(pool) => {
                let tx = pool
                    .begin()
                    .await
                    .map_err(|e| StoreError::database("beginning transaction", e))?;
                crate::trace_log!("transaction opened");
                Ok(Scope::Owned(tx))
            }
            Handle::Transaction(conn) if conn.is_in_transaction() => Ok(Scope::Joined(conn)),
            Handle::Transaction(conn) => {
                let tx = Connection::begin(conn)
                    .await
                    .map_err(|e| StoreError::database("beginning transaction", e))?;
                crate::trace_log!("transaction opened on caller connection");
                Ok(Scope::Owned(tx))
            }
        }
    }

    pub(crate) fn conn(&mut self) -> &mut PgConnection {
        match self {
            Scope::Owned(tx) => &mut **tx,
            Scope::Joined(conn) => &mut **conn,
        }
    }

    pub(crate) async fn commit(self) -> Result<(), StoreError> {
        match self {
            Scope::Owned(tx) => {
                tx.commit()
                    .await
                    .map_err(|e| StoreError::database("committing transaction", e))?;
                crate::trace_log!("transaction committed");
                Ok(())
            }
            Scope::Joined(_) => Ok(()),
        }
    }
}

/// Connection a read runs on.
pub(crate) enum Conn<'a> {
    Pooled(PoolConnection<Postgres>),
    Borrowed(&'a mut PgConnection),
}

impl<'a> Conn<'a> {
    pub(crate) async fn acquire(handle: Handle<'a>) -> Result<Self, StoreError> {
        match handle {
            Handle::Root(pool) => pool
                .acquire()
                .await
                .map(Conn::Pooled)
                .map_err(|e| StoreError::database("acquiring connection", e)),
            Handle::Transaction(conn) => Ok(Conn::Borrowed(conn)),
        }
    }

    pub(crate) fn as_mut(&mut self) -> &mut PgConnection {
        match self {
            Conn::Pooled(conn) => &mut **conn,
            Conn::Borrowed(conn) => &mut **conn,
        }
    }
}

/// Run `f` inside a transaction.
///
/// A connection with an open transaction is reused as-is and never committed
/// here. Otherwise a transaction is opened (on the pool, or on the given
/// connection) and committed when `f` succeeds; an error, a panic or
/// dropping the returned future rolls it back.
///
/// ```rust,ignore
/// let id = trx(&pool, |conn| {
///     Box::pin(async move {
///         ops::create(&mut *conn, &mut parent, &[], &[]).await?;
///         ops::create(&mut *conn, &mut child, &[], &[]).await?;
///         Ok::<_, StoreError>(parent.id.clone())
///     })
/// })
/// .await?;
/// ```
pub async fn trx<'a, T, E, F>(handle: impl Into<Handle<'a>>, f: F) -> Result<T, E>
where
    F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, E>> + Send,
    E: From<StoreError>,
{
    let mut scope = Scope::begin(handle.into()).await?;
    let value = f(scope.conn()).await?;
    scope.commit().await?;
    Ok(value)
}
