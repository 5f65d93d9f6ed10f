//! Relation descriptors
//!
//! Each record declares its relations statically, in field order. A relation
//! names the parent column (`base_column`) and the related table's column that
//! references it (`join_column`). Every relation can be eagerly loaded by
//! name; only [`Cascade::Persist`] relations take part in write cascades.

use crate::errors::StoreError;
use crate::record::{insert_statement, select_list, table_with_alias, Record};
use crate::validation::{qualify_column, quote_identifier};
use async_trait::async_trait;
use sqlx::{Encode, PgConnection, Postgres, QueryBuilder, Type};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cascade {
    None,
    /// Delete-then-insert related rows on every parent write, delete them
    /// with the parent.
    Persist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    HasOne,
    HasMany,
}

/// Values usable as join keys.
pub trait JoinKey:
    Clone + PartialEq + Send + Sync + 'static + for<'q> Encode<'q, Postgres> + Type<Postgres>
{
}

impl<T> JoinKey for T where
    T: Clone + PartialEq + Send + Sync + 'static + for<'q> Encode<'q, Postgres> + Type<Postgres>
{
}

/// Operations a relation performs on behalf of its parent record `M`.
#[async_trait]
pub trait RelationOps<M: Record>: Send + Sync {
    fn name(&self) -> &'static str;
    fn kind(&self) -> RelationKind;
    fn cascade(&self) -> Cascade;
    fn base_column(&self) -> &'static str;
    fn join_column(&self) -> &'static str;
    fn related_table(&self) -> &'static str;
    fn related_columns(&self) -> &'static [&'static str];

    /// Delete related rows referencing `parent`.
    async fn delete_related(&self, conn: &mut PgConnection, parent: &M)
        -> Result<u64, StoreError>;

    /// Insert the related record(s) currently held by `parent`.
    ///
    /// Nothing is written for `None` or an empty list.
    async fn insert_related(&self, conn: &mut PgConnection, parent: &M)
        -> Result<u64, StoreError>;

    /// Fetch related rows for all `parents` with one query and attach them.
    async fn load(&self, conn: &mut PgConnection, parents: &mut [M]) -> Result<(), StoreError>;
}

pub type Relation<M> = Arc<dyn RelationOps<M>>;

impl<M: Record> fmt::Debug for dyn RelationOps<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("cascade", &self.cascade())
            .field("related_table", &self.related_table())
            .field("join", &format!("{}={}", self.base_column(), self.join_column()))
            .finish()
    }
}

/// Name and join columns shared by both relation kinds.
#[derive(Debug, Clone, Copy)]
pub struct RelationDef {
    pub name: &'static str,
    pub base_column: &'static str,
    pub join_column: &'static str,
    pub cascade: Cascade,
}

/// Relation held in an `Option<R>` field.
pub struct HasOne<M, R, K> {
    def: RelationDef,
    parent_key: fn(&M) -> &K,
    child_key: fn(&R) -> &K,
    get: fn(&M) -> Option<&R>,
    set: fn(&mut M, Option<R>),
}

/// Relation held in a `Vec<R>` field.
pub struct HasMany<M, R, K> {
    def: RelationDef,
    parent_key: fn(&M) -> &K,
    child_key: fn(&R) -> &K,
    get: fn(&M) -> &[R],
    set: fn(&mut M, Vec<R>),
}

impl<M: Record, R: Record, K: JoinKey> HasOne<M, R, K> {
    pub fn new(
        def: RelationDef,
        parent_key: fn(&M) -> &K,
        child_key: fn(&R) -> &K,
        get: fn(&M) -> Option<&R>,
        set: fn(&mut M, Option<R>),
    ) -> Relation<M> {
        Arc::new(Self {
            def,
            parent_key,
            child_key,
            get,
            set,
        })
    }
}

impl<M: Record, R: Record, K: JoinKey> HasMany<M, R, K> {
    pub fn new(
        def: RelationDef,
        parent_key: fn(&M) -> &K,
        child_key: fn(&R) -> &K,
        get: fn(&M) -> &[R],
        set: fn(&mut M, Vec<R>),
    ) -> Relation<M> {
        Arc::new(Self {
            def,
            parent_key,
            child_key,
            get,
            set,
        })
    }
}

async fn delete_by_key<R: Record, K: JoinKey>(
    conn: &mut PgConnection,
    join_column: &str,
    key: K,
) -> Result<u64, StoreError> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "DELETE FROM {} WHERE {} = ",
        quote_identifier(R::table_name()),
        quote_identifier(join_column)
    ));
    builder.push_bind(key);

    crate::debug_log!(sql = builder.sql(), "deleting related rows");
    let result = builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(|e| StoreError::database(format!("deleting from {}", R::table_name()), e))?;
    Ok(result.rows_affected())
}

async fn insert_one<R: Record>(conn: &mut PgConnection, child: &R) -> Result<u64, StoreError> {
    let mut builder = insert_statement(child)?;

    crate::debug_log!(sql = builder.sql(), "inserting related row");
    let result = builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(|e| StoreError::database(format!("inserting into {}", R::table_name()), e))?;
    Ok(result.rows_affected())
}

/// Keys bound by one related-row query. Postgres accepts at most 65535
/// bind parameters per statement.
const MAX_KEYS_PER_QUERY: usize = 10_000;

/// One `SELECT ... IN (...)` per chunk of `keys`.
fn select_by_keys<'a, R: Record, K: JoinKey>(
    join_column: &str,
    keys: &[K],
) -> Vec<QueryBuilder<'a, Postgres>> {
    keys.chunks(MAX_KEYS_PER_QUERY)
        .map(|chunk| {
            let mut builder = QueryBuilder::<Postgres>::new(format!(
                "SELECT {} FROM {} WHERE {} IN (",
                select_list::<R>(),
                table_with_alias::<R>(),
                qualify_column(R::alias(), join_column)
            ));
            {
                let mut values = builder.separated(", ");
                for key in chunk {
                    values.push_bind(key.clone());
                }
            }
            builder.push(")");
            builder
        })
        .collect()
}

/// All rows of `R` whose `join_column` is one of `keys`.
async fn fetch_by_keys<R: Record, K: JoinKey>(
    conn: &mut PgConnection,
    join_column: &str,
    keys: Vec<K>,
) -> Result<Vec<R>, StoreError> {
    let mut rows = Vec::new();
    for mut builder in select_by_keys::<R, K>(join_column, &keys) {
        crate::debug_log!(sql = builder.sql(), "loading related rows");
        let chunk = builder
            .build_query_as::<R>()
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| StoreError::database(format!("selecting from {}", R::table_name()), e))?;
        rows.extend(chunk);
    }
    Ok(rows)
}

#[async_trait]
impl<M: Record, R: Record, K: JoinKey> RelationOps<M> for HasOne<M, R, K> {
    fn name(&self) -> &'static str {
        self.def.name
    }

    fn kind(&self) -> RelationKind {
        RelationKind::HasOne
    }

    fn cascade(&self) -> Cascade {
        self.def.cascade
    }

    fn base_column(&self) -> &'static str {
        self.def.base_column
    }

    fn join_column(&self) -> &'static str {
        self.def.join_column
    }

    fn related_table(&self) -> &'static str {
        R::table_name()
    }

    fn related_columns(&self) -> &'static [&'static str] {
        R::columns()
    }

    async fn delete_related(
        &self,
        conn: &mut PgConnection,
        parent: &M,
    ) -> Result<u64, StoreError> {
        let key = (self.parent_key)(parent).clone();
        delete_by_key::<R, K>(conn, self.def.join_column, key).await
    }

    async fn insert_related(
        &self,
        conn: &mut PgConnection,
        parent: &M,
    ) -> Result<u64, StoreError> {
        match (self.get)(parent) {
            Some(child) => insert_one(conn, child).await,
            None => Ok(0),
        }
    }

    async fn load(&self, conn: &mut PgConnection, parents: &mut [M]) -> Result<(), StoreError> {
        if parents.is_empty() {
            return Ok(());
        }

        let keys: Vec<K> = parents.iter().map(|p| (self.parent_key)(p).clone()).collect();
        let rows: Vec<R> = fetch_by_keys(conn, self.def.join_column, keys).await?;

        for parent in parents.iter_mut() {
            let key = (self.parent_key)(&*parent).clone();
            let found = rows.iter().find(|r| (self.child_key)(r) == &key).cloned();
            (self.set)(parent, found);
        }
        Ok(())
    }
}

#[async_trait]
impl<M: Record, R: Record, K: JoinKey> RelationOps<M> for HasMany<M, R, K> {
    fn name(&self) -> &'static str {
        self.def.name
    }

    fn kind(&self) -> RelationKind {
        RelationKind::HasMany
    }

    fn cascade(&self) -> Cascade {
        self.def.cascade
    }

    fn base_column(&self) -> &'static str {
        self.def.base_column
    }

    fn join_column(&self) -> &'static str {
        self.def.join_column
    }

    fn related_table(&self) -> &'static str {
        R::table_name()
    }

    fn related_columns(&self) -> &'static [&'static str] {
        R::columns()
    }

    async fn delete_related(
        &self,
        conn: &mut PgConnection,
        parent: &M,
    ) -> Result<u64, StoreError> {
        let key = (self.parent_key)(parent).clone();
        delete_by_key::<R, K>(conn, self.def.join_column, key).await
    }

    async fn insert_related(
        &self,
        conn: &mut PgConnection,
        parent: &M,
    ) -> Result<u64, StoreError> {
        let mut inserted = 0;
        for child in (self.get)(parent) {
            inserted += insert_one(&mut *conn, child).await?;
        }
        Ok(inserted)
    }

    async fn load(&self, conn: &mut PgConnection, parents: &mut [M]) -> Result<(), StoreError> {
        if parents.is_empty() {
            return Ok(());
        }

        let keys: Vec<K> = parents.iter().map(|p| (self.parent_key)(p).clone()).collect();
        let rows: Vec<R> = fetch_by_keys(conn, self.def.join_column, keys).await?;

        for parent in parents.iter_mut() {
            let key = (self.parent_key)(&*parent).clone();
            let children = rows
                .iter()
                .filter(|r| (self.child_key)(r) == &key)
                .cloned()
                .collect();
            (self.set)(parent, children);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_models::TestNote;

    #[test]
    fn related_rows_are_selected_by_key_list() {
        let keys = vec!["a".to_string(), "b".to_string()];
        let statements = select_by_keys::<TestNote, String>("test_model_id", &keys);

        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0].sql(),
            "SELECT \"test_note\".\"id\", \"test_note\".\"test_model_id\", \"test_note\".\"body\" \
             FROM \"test_notes\" AS \"test_note\" WHERE \"test_note\".\"test_model_id\" IN ($1, $2)"
        );
    }

    #[test]
    fn large_key_lists_are_split_across_statements() {
        let keys: Vec<i64> = (0..(MAX_KEYS_PER_QUERY as i64 * 2 + 1)).collect();
        let statements = select_by_keys::<TestNote, i64>("id", &keys);

        assert_eq!(statements.len(), 3);
        let last_bind = format!("${})", MAX_KEYS_PER_QUERY);
        assert!(statements[0].sql().ends_with(&last_bind));
        assert!(statements[1].sql().ends_with(&last_bind));
        assert!(statements[2].sql().ends_with("IN ($1)"));
    }

    #[test]
    fn no_keys_means_no_statements() {
        assert!(select_by_keys::<TestNote, i64>("id", &[]).is_empty());
    }
}
