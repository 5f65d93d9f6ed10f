//! The `Record` trait: one struct, one table

use crate::errors::StoreError;
use crate::relation::Relation;
use crate::validation::{quote_identifier, validate_identifier};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Postgres, QueryBuilder};
use std::fmt::Debug;

/// Table metadata and column binders for a record type.
///
/// Derive it with `#[derive(Record)]`, or use the `#[model]` attribute which
/// also adds `Debug`, `Clone` and `sqlx::FromRow`:
///
/// ```rust,ignore
/// use record_store::prelude::*;
///
/// #[model]
/// #[record(table = "test_models", alias = "test_model")]
/// pub struct TestModel {
///     #[primary_key]
///     pub id: String,
///     pub name: String,
///
///     #[relation(has_one, join = "id=test_model_id", persist)]
///     pub related: Option<TestRelated>,
/// }
/// ```
pub trait Record:
    Clone + Debug + Send + Sync + Unpin + for<'r> FromRow<'r, PgRow> + 'static
{
    fn table_name() -> &'static str;

    /// Alias used for the table in `SELECT`, `UPDATE` and `DELETE`.
    fn alias() -> &'static str;

    /// Persisted columns in declaration order.
    fn columns() -> &'static [&'static str];

    fn primary_key() -> &'static [&'static str];

    /// Bind the value of `column` onto `builder`.
    ///
    /// Returns `false` when `column` is not one of [`Record::columns`].
    fn push_column<'q>(&'q self, column: &str, builder: &mut QueryBuilder<'q, Postgres>) -> bool;

    /// Relation descriptors in declaration order.
    fn relations() -> Vec<Relation<Self>> {
        Vec::new()
    }

    /// Set conventional `created_at` / `updated_at` fields.
    fn set_timestamps(&mut self, _now: DateTime<Utc>, _is_create: bool) {}
}

/// Single primary key column, as required by lookups by id.
pub(crate) fn single_primary_key<M: Record>() -> Result<&'static str, StoreError> {
    match M::primary_key() {
        [pk] => Ok(*pk),
        other => Err(StoreError::PrimaryKeyCount {
            table: M::table_name(),
            found: other.len(),
        }),
    }
}

pub(crate) fn require_primary_key<M: Record>() -> Result<&'static [&'static str], StoreError> {
    match M::primary_key() {
        [] => Err(StoreError::MissingPrimaryKey {
            table: M::table_name(),
        }),
        pks => Ok(pks),
    }
}

/// Check the declaration of `M` before any statement is built.
pub fn validate_record<M: Record>() -> Result<(), StoreError> {
    let model = M::table_name();
    let invalid = |what: &str, e: crate::validation::ValidationError| {
        StoreError::invalid_model(model, format!("{}: {}", what, e))
    };

    validate_identifier(M::table_name()).map_err(|e| invalid("table name", e))?;
    validate_identifier(M::alias()).map_err(|e| invalid("alias", e))?;

    if M::columns().is_empty() {
        return Err(StoreError::invalid_model(model, "no columns declared"));
    }
    for column in M::columns() {
        validate_identifier(column).map_err(|e| invalid("column", e))?;
    }
    for pk in M::primary_key() {
        if !M::columns().contains(pk) {
            return Err(StoreError::invalid_model(
                model,
                format!("primary key {:?} is not a column", pk),
            ));
        }
    }

    for relation in M::relations() {
        if !M::columns().contains(&relation.base_column()) {
            return Err(StoreError::invalid_model(
                model,
                format!(
                    "relation {:?} joins on unknown column {:?}",
                    relation.name(),
                    relation.base_column()
                ),
            ));
        }
        if !relation.related_columns().contains(&relation.join_column()) {
            return Err(StoreError::invalid_model(
                model,
                format!(
                    "relation {:?} joins on unknown column {:?} of {}",
                    relation.name(),
                    relation.join_column(),
                    relation.related_table()
                ),
            ));
        }
    }

    Ok(())
}

/// `"alias"."c1", "alias"."c2", ...`
pub(crate) fn select_list<M: Record>() -> String {
    let alias = quote_identifier(M::alias());
    M::columns()
        .iter()
        .map(|c| format!("{}.{}", alias, quote_identifier(c)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `"table" AS "alias"`
pub(crate) fn table_with_alias<M: Record>() -> String {
    format!(
        "{} AS {}",
        quote_identifier(M::table_name()),
        quote_identifier(M::alias())
    )
}

pub(crate) fn push_value<'q, M: Record>(
    record: &'q M,
    column: &str,
    builder: &mut QueryBuilder<'q, Postgres>,
) -> Result<(), StoreError> {
    if record.push_column(column, builder) {
        Ok(())
    } else {
        Err(StoreError::invalid_model(
            M::table_name(),
            format!("no binder for column {:?}", column),
        ))
    }
}

/// `"alias"."pk1" = $n AND ...` for every primary key column.
pub(crate) fn push_primary_key_filter<'q, M: Record>(
    record: &'q M,
    builder: &mut QueryBuilder<'q, Postgres>,
) -> Result<(), StoreError> {
    let alias = quote_identifier(M::alias());
    for (i, pk) in require_primary_key::<M>()?.iter().enumerate() {
        if i > 0 {
            builder.push(" AND ");
        }
        builder.push(format!("{}.{} = ", alias, quote_identifier(pk)));
        push_value(record, pk, builder)?;
    }
    Ok(())
}

/// `INSERT INTO "table" ("c1", ...) VALUES ($1, ...)`
pub(crate) fn insert_statement<M: Record>(
    record: &M,
) -> Result<QueryBuilder<'_, Postgres>, StoreError> {
    let columns = M::columns()
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");

    let mut builder = QueryBuilder::new(format!(
        "INSERT INTO {} ({}) VALUES (",
        quote_identifier(M::table_name()),
        columns
    ));
    for (i, column) in M::columns().iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        push_value(record, column, &mut builder)?;
    }
    builder.push(")");
    Ok(builder)
}

/// `UPDATE "table" AS "alias" SET ... WHERE <primary key>`
///
/// `None` when every column is part of the primary key.
pub(crate) fn update_statement<M: Record>(
    record: &M,
) -> Result<Option<QueryBuilder<'_, Postgres>>, StoreError> {
    let pks = require_primary_key::<M>()?;
    let assignable: Vec<&str> = M::columns()
        .iter()
        .copied()
        .filter(|c| !pks.contains(c))
        .collect();
    if assignable.is_empty() {
        return Ok(None);
    }

    let mut builder = QueryBuilder::new(format!("UPDATE {} SET ", table_with_alias::<M>()));
    for (i, column) in assignable.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        builder.push(format!("{} = ", quote_identifier(column)));
        push_value(record, column, &mut builder)?;
    }
    builder.push(" WHERE ");
    push_primary_key_filter(record, &mut builder)?;
    Ok(Some(builder))
}

/// `SELECT EXISTS (SELECT 1 FROM "table" AS "alias" WHERE <primary key>)`
pub(crate) fn exists_statement<M: Record>(
    record: &M,
) -> Result<QueryBuilder<'_, Postgres>, StoreError> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE ",
        table_with_alias::<M>()
    ));
    push_primary_key_filter(record, &mut builder)?;
    builder.push(")");
    Ok(builder)
}

/// `DELETE FROM "table" AS "alias" WHERE <primary key>`
pub(crate) fn delete_statement<M: Record>(
    record: &M,
) -> Result<QueryBuilder<'_, Postgres>, StoreError> {
    let mut builder = QueryBuilder::new(format!("DELETE FROM {} WHERE ", table_with_alias::<M>()));
    push_primary_key_filter(record, &mut builder)?;
    Ok(builder)
}
