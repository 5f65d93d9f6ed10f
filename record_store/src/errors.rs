//! Error types for record operations
//!
//! Every driver error keeps its `sqlx::Error` as the source, so callers can
//! classify conflicts with [`StoreError::as_database_error`] and detect the
//! no-rows signal with [`StoreError::is_not_found`].

use errs::BoxError;
use sqlx::error::DatabaseError;
use std::fmt;
use thiserror::Error;

/// Write operation a before-hook was running for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        })
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid model {model}: {reason}")]
    InvalidModel { model: &'static str, reason: String },

    #[error("{table} must have exactly one primary key column, found {found}")]
    PrimaryKeyCount { table: &'static str, found: usize },

    #[error("{table} has no primary key column")]
    MissingPrimaryKey { table: &'static str },

    #[error("unknown relation {relation:?} on {table}")]
    UnknownRelation { table: &'static str, relation: String },

    #[error("model to be updated does not exist")]
    UpdateNotExists,

    #[error("{context}: {source}")]
    Database {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("before {operation} hook {hook:?}: {source}")]
    Hook {
        operation: Operation,
        hook: String,
        #[source]
        source: BoxError,
    },

    #[error("mapping {direction}: {source}")]
    Mapping {
        direction: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    pub fn database(context: impl Into<String>, source: sqlx::Error) -> Self {
        StoreError::Database {
            context: context.into(),
            source,
        }
    }

    pub fn invalid_model(model: &'static str, reason: impl Into<String>) -> Self {
        StoreError::InvalidModel {
            model,
            reason: reason.into(),
        }
    }

    /// Prefix this error with an operation-level message.
    pub fn context(self, context: impl Into<String>) -> Self {
        StoreError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The error underneath any [`StoreError::Context`] layers.
    pub fn root(&self) -> &StoreError {
        match self {
            StoreError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// The driver reported no rows.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root(),
            StoreError::Database {
                source: sqlx::Error::RowNotFound,
                ..
            }
        )
    }

    pub fn is_update_not_exists(&self) -> bool {
        matches!(self.root(), StoreError::UpdateNotExists)
    }

    /// The database-reported error, if this came from the server.
    pub fn as_database_error(&self) -> Option<&(dyn DatabaseError + 'static)> {
        match self.root() {
            StoreError::Database { source, .. } => source.as_database_error(),
            _ => None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.as_database_error()
            .map(|e| e.is_unique_violation())
            .unwrap_or(false)
    }

    /// The error a before-hook returned, when this is a hook abort.
    pub fn hook_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self.root() {
            StoreError::Hook { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
