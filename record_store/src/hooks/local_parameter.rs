//! Transaction-local settings applied before a write
//!
//! Row-level security policies and audit triggers often read settings such as
//! `app.user_id`; setting them with `is_local = true` scopes them to the
//! write's transaction.

use super::{Hook, SharedHook};
use crate::record::Record;
use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// Before-hook issuing `SELECT set_config($1, $2, true), ...` with the
/// settings returned by its closure.
pub struct LocalParameters<M, F> {
    parameters: F,
    _record: PhantomData<fn(M)>,
}

impl<M, F> LocalParameters<M, F>
where
    M: Record,
    F: Fn(&M) -> BTreeMap<String, String> + Send + Sync + 'static,
{
    pub fn new(parameters: F) -> Self {
        Self {
            parameters,
            _record: PhantomData,
        }
    }
}

pub fn local_parameters<M, F>(parameters: F) -> SharedHook<M>
where
    M: Record,
    F: Fn(&M) -> BTreeMap<String, String> + Send + Sync + 'static,
{
    Arc::new(LocalParameters::new(parameters))
}

/// `None` when there is nothing to set.
pub(crate) fn set_config_statement(
    parameters: BTreeMap<String, String>,
) -> Option<QueryBuilder<'static, Postgres>> {
    if parameters.is_empty() {
        return None;
    }

    let mut builder = QueryBuilder::new("SELECT ");
    for (i, (name, value)) in parameters.into_iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        builder.push("set_config(");
        builder.push_bind(name);
        builder.push(", ");
        builder.push_bind(value);
        builder.push(", true)");
    }
    Some(builder)
}

#[async_trait]
impl<M, F> Hook<M> for LocalParameters<M, F>
where
    M: Record,
    F: Fn(&M) -> BTreeMap<String, String> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "local_parameters"
    }

    async fn before(&self, conn: &mut PgConnection, record: &mut M) -> anyhow::Result<()> {
        let Some(mut builder) = set_config_statement((self.parameters)(&*record)) else {
            return Ok(());
        };

        crate::debug_log!(sql = builder.sql(), "setting local parameters");
        builder
            .build()
            .execute(&mut *conn)
            .await
            .context("setting local parameters")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_one_statement_sorted_by_name() {
        let mut parameters = BTreeMap::new();
        parameters.insert("app.user_id".to_string(), "42".to_string());
        parameters.insert("app.request_id".to_string(), "abc".to_string());

        let builder = set_config_statement(parameters).expect("statement");
        assert_eq!(
            builder.sql(),
            "SELECT set_config($1, $2, true), set_config($3, $4, true)"
        );
    }

    #[test]
    fn no_statement_without_parameters() {
        assert!(set_config_statement(BTreeMap::new()).is_none());
    }
}
