//! DELETE criteria overriding the primary key filter

use super::filter::{Conditions, QueryOperator};
use crate::record::{table_with_alias, Record};
use sqlx::{Encode, Postgres, QueryBuilder, Type};
use std::marker::PhantomData;

/// Criteria for a `DELETE` over `M`'s table.
///
/// With no conditions the statement deletes every row.
pub struct DeleteQuery<'q, M> {
    conditions: Conditions<'q>,
    _record: PhantomData<fn() -> M>,
}

impl<M: Record> Default for DeleteQuery<'_, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'q, M: Record> DeleteQuery<'q, M> {
    pub fn new() -> Self {
        Self {
            conditions: Conditions::default(),
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

    pub fn is_null(&mut self, column: &str) -> &mut Self {
        self.conditions.null(column, false);
        self
    }

    pub fn where_raw(&mut self, sql: impl Into<String>) -> &mut Self {
        self.conditions.raw(sql.into());
        self
    }

    pub fn into_builder(self) -> QueryBuilder<'q, Postgres> {
        let mut builder = QueryBuilder::new(format!("DELETE FROM {}", table_with_alias::<M>()));
        self.conditions.push_where(M::alias(), &mut builder);
        builder
    }

    pub fn to_sql(self) -> String {
        self.into_builder().sql().to_string()
    }
}
