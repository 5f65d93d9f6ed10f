//! # pubsub
//!
//! Topic publishing and subscriptions on Redis Streams. A topic is a stream;
//! a subscription is a consumer group on it.
//!
//! ```rust,no_run
//! use config::PubSubConfig;
//! use pubsub::{init_local, PubSubMessage, Publisher};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), pubsub::PubSubError> {
//! let config = PubSubConfig::new("redis://127.0.0.1/", "orders", "billing");
//! let (publisher, subscription) = init_local(&config).await?;
//!
//! publisher
//!     .publish(&PubSubMessage::new("order 42").with_attribute("type", "created"))
//!     .await?;
//!
//! for message in subscription.pull(10, Duration::from_secs(1)).await? {
//!     subscription.ack(&message.id).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod message;
pub mod publisher;
pub mod subscription;

pub use errors::PubSubError;
pub use message::PubSubMessage;
pub use publisher::{NopPublisher, Publisher, TopicPublisher};
pub use subscription::Subscription;

use config::PubSubConfig;

/// Create the topic stream and the subscription's consumer group when they
/// do not exist yet, then connect a publisher and a subscription to them.
pub async fn init_local(
    config: &PubSubConfig,
) -> Result<(TopicPublisher, Subscription), PubSubError> {
    let client = redis::Client::open(config.redis_url.as_str())?;
    let mut connection = client.get_multiplexed_async_connection().await?;

    let created: redis::RedisResult<()> = redis::cmd("XGROUP")
        .arg("CREATE")
        .arg(&config.topic)
        .arg(&config.subscription)
        .arg("$")
        .arg("MKSTREAM")
        .query_async(&mut connection)
        .await;
    match created {
        Ok(()) => {
            tracing::info!(topic = %config.topic, group = %config.subscription, "subscription created");
        }
        Err(e) if is_already_exists(&e) => {}
        Err(source) => {
            return Err(PubSubError::Setup {
                what: "subscription",
                source,
            });
        }
    }

    // Blocking reads get their own connection so they never hold up publishes.
    let subscriber = client.get_multiplexed_async_connection().await?;

    Ok((
        TopicPublisher::new(connection, config.topic.clone()),
        Subscription::new(
            subscriber,
            config.topic.clone(),
            config.subscription.clone(),
            config.consumer.clone(),
        ),
    ))
}

fn is_already_exists(error: &redis::RedisError) -> bool {
    error.code() == Some("BUSYGROUP")
}
