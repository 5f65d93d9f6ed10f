//! Consuming a topic stream through a consumer group

use crate::errors::PubSubError;
use crate::message::PubSubMessage;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamReadOptions, StreamReadReply};
use std::fmt;
use std::time::Duration;

/// A consumer in the subscription's consumer group.
///
/// Pulled messages stay pending until acknowledged with [`Subscription::ack`].
#[derive(Clone)]
pub struct Subscription {
    connection: MultiplexedConnection,
    topic: String,
    group: String,
    consumer: String,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("group", &self.group)
            .field("consumer", &self.consumer)
            .finish()
    }
}

impl Subscription {
    pub fn new(
        connection: MultiplexedConnection,
        topic: impl Into<String>,
        group: impl Into<String>,
        consumer: impl Into<String>,
    ) -> Self {
        Self {
            connection,
            topic: topic.into(),
            group: group.into(),
            consumer: consumer.into(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Up to `max` messages not yet delivered to the group, waiting at most
    /// `block` for the first one. A zero `block` returns at once. Empty when
    /// nothing arrived in time. Entries that cannot be decoded are logged
    /// and skipped; they stay pending for the group.
    pub async fn pull(
        &self,
        max: usize,
        block: Duration,
    ) -> Result<Vec<PubSubMessage>, PubSubError> {
        let mut options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(max);
        // BLOCK 0 waits forever.
        if !block.is_zero() {
            options = options.block(block.as_millis().max(1) as usize);
        }

        let mut connection = self.connection.clone();
        let reply: Option<StreamReadReply> = connection
            .xread_options(&[&self.topic], &[">"], &options)
            .await?;

        let messages = decode_reply(&self.topic, reply);
        tracing::trace!(topic = %self.topic, count = messages.len(), "messages pulled");
        Ok(messages)
    }

    /// Acknowledge a pulled message so it leaves the pending list.
    pub async fn ack(&self, id: &str) -> Result<(), PubSubError> {
        let mut connection = self.connection.clone();
        let _: i64 = connection.xack(&self.topic, &self.group, &[id]).await?;
        Ok(())
    }
}

fn decode_reply(topic: &str, reply: Option<StreamReadReply>) -> Vec<PubSubMessage> {
    let mut messages = Vec::new();
    for key in reply.map(|r| r.keys).unwrap_or_default() {
        for entry in key.ids {
            match PubSubMessage::from_fields(entry.id, &entry.map) {
                Ok(message) => messages.push(message),
                Err(error) => {
                    tracing::warn!(topic, %error, "skipping malformed message");
                }
            }
        }
    }
    messages
}
