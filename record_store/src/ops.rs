//! Generic reads and writes of records
//!
//! Writes run in a transaction (their own, or the caller's when the handle is
//! already inside one): before-hooks in order, the statement, the related
//! record cascade, commit, then after-hooks in order.

use crate::errors::{Operation, StoreError};
use crate::handle::{Conn, Handle, Scope};
use crate::hooks::{run_after, run_before, SharedHook};
use crate::query::{DeleteQuery, SelectQuery};
use crate::record::{
    delete_statement, exists_statement, insert_statement, single_primary_key, update_statement,
    validate_record, Record,
};
use crate::relation::{Cascade, Relation};
use sqlx::{Encode, PgConnection, Postgres, Type};

/// Criteria replacing the primary key filter of [`delete`].
pub type DeleteCriteria<'q, M> = Box<dyn FnOnce(&mut DeleteQuery<'q, M>) + Send + 'q>;

/// All rows matching `criteria`; empty when none match.
///
/// Relations named with [`SelectQuery::relation`] are loaded after the main
/// query, one statement per relation.
pub async fn find<'a, 'q, M, F>(
    handle: impl Into<Handle<'a>>,
    criteria: F,
) -> Result<Vec<M>, StoreError>
where
    M: Record,
    F: FnOnce(&mut SelectQuery<'q, M>) + Send,
{
    validate_record::<M>()?;

    let mut query = SelectQuery::new();
    criteria(&mut query);

    fetch_all(handle.into(), query).await
}

/// First row matching `criteria`.
///
/// Fails with the not-found signal ([`StoreError::is_not_found`]) when no row
/// matches.
pub async fn find_first<'a, 'q, M, F>(
    handle: impl Into<Handle<'a>>,
    criteria: F,
) -> Result<M, StoreError>
where
    M: Record,
    F: FnOnce(&mut SelectQuery<'q, M>) + Send,
{
    validate_record::<M>()?;

    let mut query = SelectQuery::new();
    criteria(&mut query);

    fetch_one(handle.into(), query).await
}

/// The row whose single primary key column equals `id`.
pub async fn find_by_id<'a, 'q, M, V, F>(
    handle: impl Into<Handle<'a>>,
    id: V,
    criteria: F,
) -> Result<M, StoreError>
where
    M: Record,
    V: 'q + Encode<'q, Postgres> + Type<Postgres> + Send,
    F: FnOnce(&mut SelectQuery<'q, M>) + Send,
{
    validate_record::<M>()?;
    let pk = single_primary_key::<M>()?;

    let mut query = SelectQuery::new();
    query.eq(pk, id);
    criteria(&mut query);

    fetch_one(handle.into(), query).await
}

/// [`find_by_id`] taking a row lock (`FOR UPDATE OF alias`).
///
/// With `skip_locked` a row locked by another transaction is skipped instead
/// of awaited, so the call fails with the not-found signal. Only meaningful
/// inside a transaction; on a root handle the lock is released as soon as
/// the statement completes.
pub async fn find_by_id_for_update<'a, 'q, M, V, F>(
    handle: impl Into<Handle<'a>>,
    id: V,
    skip_locked: bool,
    criteria: F,
) -> Result<M, StoreError>
where
    M: Record,
    V: 'q + Encode<'q, Postgres> + Type<Postgres> + Send,
    F: FnOnce(&mut SelectQuery<'q, M>) + Send,
{
    validate_record::<M>()?;
    let pk = single_primary_key::<M>()?;

    let mut query = SelectQuery::new();
    query.eq(pk, id).for_update(skip_locked);
    criteria(&mut query);

    fetch_one(handle.into(), query).await
}

/// Insert `record` and its persisted relations.
pub async fn create<'a, M: Record>(
    handle: impl Into<Handle<'a>>,
    record: &mut M,
    before: &[SharedHook<M>],
    after: &[SharedHook<M>],
) -> Result<(), StoreError> {
    validate_record::<M>()?;

    let mut scope = Scope::begin(handle.into()).await?;
    let conn = scope.conn();

    run_before(Operation::Create, before, &mut *conn, record).await?;

    let mut insert = insert_statement(&*record)?;
    crate::debug_log!(sql = insert.sql(), "create");
    insert
        .build()
        .execute(&mut *conn)
        .await
        .map_err(|e| StoreError::database("inserting model", e))?;

    cascade(&mut *conn, &*record, false)
        .await
        .map_err(|e| e.context("creating related models"))?;

    scope.commit().await?;

    run_after(after, record).await;
    Ok(())
}

/// Update `record` by primary key and replace its persisted relations.
///
/// Fails with [`StoreError::UpdateNotExists`] when no row has the record's
/// primary key; nothing is written in that case.
pub async fn update<'a, M: Record>(
    handle: impl Into<Handle<'a>>,
    record: &mut M,
    before: &[SharedHook<M>],
    after: &[SharedHook<M>],
) -> Result<(), StoreError> {
    validate_record::<M>()?;

    let mut scope = Scope::begin(handle.into()).await?;
    let conn = scope.conn();

    let found: bool = {
        let mut exists = exists_statement(&*record)?;
        crate::debug_log!(sql = exists.sql(), "update exists check");
        exists
            .build_query_scalar()
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| StoreError::database("checking if model exists", e))?
    };
    if !found {
        return Err(StoreError::UpdateNotExists);
    }

    run_before(Operation::Update, before, &mut *conn, record).await?;

    if let Some(mut statement) = update_statement(&*record)? {
        crate::debug_log!(sql = statement.sql(), "update");
        statement
            .build()
            .execute(&mut *conn)
            .await
            .map_err(|e| StoreError::database("updating model", e))?;
    }

    cascade(&mut *conn, &*record, false)
        .await
        .map_err(|e| e.context("updating related models"))?;

    scope.commit().await?;

    run_after(after, record).await;
    Ok(())
}

/// Delete `record` and the rows of its persisted relations.
///
/// `criteria` replaces the primary key filter when given; related rows are
/// still matched through `record`'s own keys.
pub async fn delete<'a, 'q, M: Record>(
    handle: impl Into<Handle<'a>>,
    record: &mut M,
    criteria: Option<DeleteCriteria<'q, M>>,
    before: &[SharedHook<M>],
    after: &[SharedHook<M>],
) -> Result<(), StoreError> {
    validate_record::<M>()?;

    let mut scope = Scope::begin(handle.into()).await?;
    let conn = scope.conn();

    run_before(Operation::Delete, before, &mut *conn, record).await?;

    let deleted = match criteria {
        Some(criteria) => {
            let mut query = DeleteQuery::<M>::new();
            criteria(&mut query);
            let mut statement = query.into_builder();
            crate::debug_log!(sql = statement.sql(), "delete");
            statement.build().execute(&mut *conn).await
        }
        None => {
            let mut statement = delete_statement(&*record)?;
            crate::debug_log!(sql = statement.sql(), "delete");
            statement.build().execute(&mut *conn).await
        }
    };
    deleted.map_err(|e| StoreError::database("deleting model", e))?;

    cascade(&mut *conn, &*record, true)
        .await
        .map_err(|e| e.context("deleting related models"))?;

    scope.commit().await?;

    run_after(after, record).await;
    Ok(())
}

/// Delete-then-insert the rows of every persisted relation, in declaration
/// order. The delete always runs, also for a fresh insert; nothing is
/// re-inserted when `deleting`.
async fn cascade<M: Record>(
    conn: &mut PgConnection,
    record: &M,
    deleting: bool,
) -> Result<(), StoreError> {
    for relation in M::relations() {
        if relation.cascade() != Cascade::Persist {
            continue;
        }

        relation
            .delete_related(&mut *conn, record)
            .await
            .map_err(|e| {
                e.context(format!("deleting related model ({})", relation.related_table()))
            })?;
        crate::trace_log!(relation = relation.name(), "related rows deleted");

        if deleting {
            continue;
        }

        relation
            .insert_related(&mut *conn, record)
            .await
            .map_err(|e| {
                e.context(format!("inserting related model ({})", relation.related_table()))
            })?;
    }
    Ok(())
}

/// Declared relations matching `names`, in the order requested.
fn named_relations<M: Record>(names: Vec<String>) -> Result<Vec<Relation<M>>, StoreError> {
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let declared = M::relations();
    names
        .into_iter()
        .map(|name| match declared.iter().find(|r| r.name() == name) {
            Some(relation) => Ok(relation.clone()),
            None => Err(StoreError::UnknownRelation {
                table: M::table_name(),
                relation: name,
            }),
        })
        .collect()
}

async fn load_relations<M: Record>(
    conn: &mut PgConnection,
    relations: &[Relation<M>],
    rows: &mut [M],
) -> Result<(), StoreError> {
    for relation in relations {
        relation
            .load(&mut *conn, rows)
            .await
            .map_err(|e| e.context(format!("loading relation {}", relation.name())))?;
    }
    Ok(())
}

async fn fetch_all<'q, M: Record>(
    handle: Handle<'_>,
    mut query: SelectQuery<'q, M>,
) -> Result<Vec<M>, StoreError> {
    let relations = named_relations::<M>(query.take_relations())?;
    let mut builder = query.into_builder();

    let mut conn = Conn::acquire(handle).await?;
    crate::debug_log!(sql = builder.sql(), "find");
    let mut rows = builder
        .build_query_as::<M>()
        .fetch_all(conn.as_mut())
        .await
        .map_err(|e| StoreError::database("scanning model", e))?;

    load_relations(conn.as_mut(), &relations, &mut rows).await?;
    Ok(rows)
}

async fn fetch_one<'q, M: Record>(
    handle: Handle<'_>,
    mut query: SelectQuery<'q, M>,
) -> Result<M, StoreError> {
    let relations = named_relations::<M>(query.take_relations())?;
    let mut builder = query.into_builder();

    let mut conn = Conn::acquire(handle).await?;
    crate::debug_log!(sql = builder.sql(), "find one");
    let row = builder
        .build_query_as::<M>()
        .fetch_one(conn.as_mut())
        .await
        .map_err(|e| StoreError::database("scanning model", e))?;

    let mut rows = [row];
    load_relations(conn.as_mut(), &relations, &mut rows).await?;
    let [row] = rows;
    Ok(row)
}
