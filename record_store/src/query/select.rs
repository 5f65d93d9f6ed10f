//! SELECT criteria for one record type

use super::filter::{Conditions, QueryOperator};
use super::ordering::SortOrder;
use crate::record::{select_list, table_with_alias, Record};
use crate::validation::{qualify_column, quote_identifier};
use sqlx::{Encode, Postgres, QueryBuilder, Type};
use std::fmt;
use std::marker::PhantomData;

/// Row lock taken by the select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLock {
    /// `FOR UPDATE OF alias`, waiting for contending locks.
    ForUpdate,
    /// `FOR UPDATE OF alias SKIP LOCKED`, leaving locked rows out.
    ForUpdateSkipLocked,
}

/// Criteria refining a `SELECT` over `M`'s table.
///
/// Handed to the criteria callback of the find operations:
///
/// ```rust,ignore
/// let rows = find::<TestModel, _>(&pool, |q| {
///     q.eq("name", "x").order_by("id", SortOrder::Desc).limit(10);
/// })
/// .await?;
/// ```
pub struct SelectQuery<'q, M> {
    conditions: Conditions<'q>,
    order: Vec<(String, SortOrder)>,
    limit: Option<i64>,
    offset: Option<i64>,
    lock: Option<RowLock>,
    relations: Vec<String>,
    _record: PhantomData<fn() -> M>,
}

impl<M: Record> fmt::Debug for SelectQuery<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectQuery")
            .field("table", &M::table_name())
            .field("conditions", &self.conditions.len())
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("lock", &self.lock)
            .field("relations", &self.relations)
            .finish()
    }
}

impl<M: Record> Default for SelectQuery<'_, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'q, M: Record> SelectQuery<'q, M> {
    pub fn new() -> Self {
        Self {
            conditions: Conditions::default(),
            order: Vec::new(),
            limit: None,
            offset: None,
            lock: None,
            relations: Vec::new(),
            _record: PhantomData,
        }
    }

    pub fn filter<V>(&mut self, column: &str, operator: QueryOperator, value: V) -> &mut Self
    where
        V: 'q + Encode<'q, Postgres> + Type<Postgres> + Send,
    {
        self.conditions.compare(column, operator, value);
        self
    }

    pub fn eq<V>(&mut self, column: &str, value: V) -> &mut Self
    where
        V: 'q + Encode<'q, Postgres> + Type<Postgres> + Send,
    {
        self.filter(column, QueryOperator::Eq, value)
    }

    pub fn is_in<V>(&mut self, column: &str, values: Vec<V>) -> &mut Self
    where
        V: 'q + Encode<'q, Postgres> + Type<Postgres> + Send,
    {
        self.conditions.is_in(column, values, false);
        self
    }

    pub fn not_in<V>(&mut self, column: &str, values: Vec<V>) -> &mut Self
    where
        V: 'q + Encode<'q, Postgres> + Type<Postgres> + Send,
    {
        self.conditions.is_in(column, values, true);
        self
    }

    pub fn is_null(&mut self, column: &str) -> &mut Self {
        self.conditions.null(column, false);
        self
    }

    pub fn is_not_null(&mut self, column: &str) -> &mut Self {
        self.conditions.null(column, true);
        self
    }

    /// Add a literal SQL condition. Never interpolate untrusted input here.
    pub fn where_raw(&mut self, sql: impl Into<String>) -> &mut Self {
        self.conditions.raw(sql.into());
        self
    }

    pub fn order_by(&mut self, column: &str, order: SortOrder) -> &mut Self {
        self.order.push((column.to_string(), order));
        self
    }

    pub fn limit(&mut self, limit: i64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: i64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// Eagerly load the relation declared under `name`.
    pub fn relation(&mut self, name: &str) -> &mut Self {
        if !self.relations.iter().any(|r| r == name) {
            self.relations.push(name.to_string());
        }
        self
    }

    pub fn for_update(&mut self, skip_locked: bool) -> &mut Self {
        self.lock = Some(if skip_locked {
            RowLock::ForUpdateSkipLocked
        } else {
            RowLock::ForUpdate
        });
        self
    }

    pub(crate) fn take_relations(&mut self) -> Vec<String> {
        std::mem::take(&mut self.relations)
    }

    pub fn into_builder(self) -> QueryBuilder<'q, Postgres> {
        let alias = M::alias();
        let mut builder = QueryBuilder::new(format!(
            "SELECT {} FROM {}",
            select_list::<M>(),
            table_with_alias::<M>()
        ));

        self.conditions.push_where(alias, &mut builder);

        for (i, (column, order)) in self.order.iter().enumerate() {
            builder.push(if i == 0 { " ORDER BY " } else { ", " });
            builder.push(format!("{} {}", qualify_column(alias, column), order.to_sql()));
        }
        if let Some(limit) = self.limit {
            builder.push(format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            builder.push(format!(" OFFSET {}", offset));
        }

        match self.lock {
            Some(RowLock::ForUpdate) => {
                builder.push(format!(" FOR UPDATE OF {}", quote_identifier(alias)));
            }
            Some(RowLock::ForUpdateSkipLocked) => {
                builder.push(format!(
                    " FOR UPDATE OF {} SKIP LOCKED",
                    quote_identifier(alias)
                ));
            }
            None => {}
        }

        builder
    }

    /// The SQL text this query renders to.
    pub fn to_sql(self) -> String {
        self.into_builder().sql().to_string()
    }
}
