//! Publishing to a topic stream

use crate::errors::PubSubError;
use crate::message::PubSubMessage;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use std::fmt;

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, message: &PubSubMessage) -> Result<(), PubSubError>;
}

/// Publisher that drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopPublisher;

#[async_trait]
impl Publisher for NopPublisher {
    async fn publish(&self, _message: &PubSubMessage) -> Result<(), PubSubError> {
        Ok(())
    }
}

/// Publisher appending to the topic's Redis stream with `XADD`.
#[derive(Clone)]
pub struct TopicPublisher {
    connection: MultiplexedConnection,
    topic: String,
}

impl fmt::Debug for TopicPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicPublisher")
            .field("topic", &self.topic)
            .finish()
    }
}

impl TopicPublisher {
    pub fn new(connection: MultiplexedConnection, topic: impl Into<String>) -> Self {
        Self {
            connection,
            topic: topic.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl Publisher for TopicPublisher {
    async fn publish(&self, message: &PubSubMessage) -> Result<(), PubSubError> {
        let mut connection = self.connection.clone();
        let fields = message.to_fields();
        let id: String = connection
            .xadd(&self.topic, "*", fields.as_slice())
            .await?;
        tracing::debug!(topic = %self.topic, %id, "message published");
        Ok(())
    }
}
