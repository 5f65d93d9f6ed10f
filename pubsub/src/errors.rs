//! Error types for pub/sub operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PubSubError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("creating {what}: {source}")]
    Setup {
        what: &'static str,
        #[source]
        source: redis::RedisError,
    },

    #[error("malformed message {id}: {reason}")]
    MalformedMessage { id: String, reason: String },
}
