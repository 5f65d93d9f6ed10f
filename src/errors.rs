//! Errors of the infrastructure helpers

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("invalid configuration")]
    Config(#[from] config::ConfigError),

    #[error("parsing connection string")]
    ConnectionString(#[source] sqlx::Error),

    #[error("pinging database ({attempts} attempts)")]
    Ping {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    #[error("database health check")]
    HealthCheck(#[source] sqlx::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("no layout matched")]
    NoLayoutMatched { input: String },
}
