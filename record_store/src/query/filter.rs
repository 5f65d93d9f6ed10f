//! WHERE conditions
//!
//! Values are bound as statement parameters; column names are qualified with
//! the table alias when they are plain identifiers.

use crate::validation::qualify_column;
use sqlx::{Encode, Postgres, QueryBuilder, Type};

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Eq,    // =
    Ne,    // !=
    Gt,    // >
    Gte,   // >=
    Lt,    // <
    Lte,   // <=
    Like,  // LIKE
    ILike, // ILIKE (case insensitive)
}

impl QueryOperator {
    pub fn to_sql(&self) -> &'static str {
        match self {
            QueryOperator::Eq => "=",
            QueryOperator::Ne => "!=",
            QueryOperator::Gt => ">",
            QueryOperator::Gte => ">=",
            QueryOperator::Lt => "<",
            QueryOperator::Lte => "<=",
            QueryOperator::Like => "LIKE",
            QueryOperator::ILike => "ILIKE",
        }
    }
}

type Binder<'q> = Box<dyn FnOnce(&mut QueryBuilder<'q, Postgres>) + Send + 'q>;

enum Condition<'q> {
    Compare {
        column: String,
        operator: QueryOperator,
        bind: Binder<'q>,
    },
    In {
        column: String,
        negated: bool,
        len: usize,
        bind: Binder<'q>,
    },
    Null {
        column: String,
        negated: bool,
    },
    Raw(String),
}

/// Conditions joined with `AND`.
#[derive(Default)]
pub(crate) struct Conditions<'q> {
    items: Vec<Condition<'q>>,
}

impl<'q> Conditions<'q> {
    pub(crate) fn compare<V>(&mut self, column: &str, operator: QueryOperator, value: V)
    where
        V: 'q + Encode<'q, Postgres> + Type<Postgres> + Send,
    {
        self.items.push(Condition::Compare {
            column: column.to_string(),
            operator,
            bind: Box::new(move |builder: &mut QueryBuilder<'q, Postgres>| {
                builder.push_bind(value);
            }),
        });
    }

    pub(crate) fn is_in<V>(&mut self, column: &str, values: Vec<V>, negated: bool)
    where
        V: 'q + Encode<'q, Postgres> + Type<Postgres> + Send,
    {
        self.items.push(Condition::In {
            column: column.to_string(),
            negated,
            len: values.len(),
            bind: Box::new(move |builder: &mut QueryBuilder<'q, Postgres>| {
                let mut separated = builder.separated(", ");
                for value in values {
                    separated.push_bind(value);
                }
            }),
        });
    }

    pub(crate) fn null(&mut self, column: &str, negated: bool) {
        self.items.push(Condition::Null {
            column: column.to_string(),
            negated,
        });
    }

    pub(crate) fn raw(&mut self, sql: String) {
        self.items.push(Condition::Raw(sql));
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    /// Append ` WHERE ...` when there is at least one condition.
    pub(crate) fn push_where(self, alias: &str, builder: &mut QueryBuilder<'q, Postgres>) {
        for (i, condition) in self.items.into_iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });

            match condition {
                Condition::Compare {
                    column,
                    operator,
                    bind,
                } => {
                    builder.push(format!(
                        "{} {} ",
                        qualify_column(alias, &column),
                        operator.to_sql()
                    ));
                    bind(builder);
                }
                // `IN ()` is a syntax error in Postgres.
                Condition::In {
                    negated, len: 0, ..
                } => {
                    builder.push(if negated { "TRUE" } else { "FALSE" });
                }
                Condition::In {
                    column,
                    negated,
                    bind,
                    ..
                } => {
                    builder.push(format!(
                        "{} {} (",
                        qualify_column(alias, &column),
                        if negated { "NOT IN" } else { "IN" }
                    ));
                    bind(builder);
                    builder.push(")");
                }
                Condition::Null { column, negated } => {
                    builder.push(format!(
                        "{} {}",
                        qualify_column(alias, &column),
                        if negated { "IS NOT NULL" } else { "IS NULL" }
                    ));
                }
                Condition::Raw(sql) => {
                    builder.push(format!("({})", sql));
                }
            }
        }
    }
}
