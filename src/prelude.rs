//! Convenience re-exports for common svc-common usage
//!
//! ```rust
//! use svc_common::prelude::*;
//! ```

pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::errors::{DateError, InfraError};
pub use crate::filelog::{FileLog, FileLogger, NopLog};

pub use config::env::{self, Environment};
pub use config::{AppConfig, DatabaseConfig, LogFormat, LoggingConfig, PubSubConfig};

pub use errs::{BoxError, ResultExt, Wrapped};

pub use http_request::{Client as HttpClient, ClientBuilder as HttpClientBuilder, RequestError};

pub use pubsub::{NopPublisher, PubSubError, PubSubMessage, Publisher, Subscription, TopicPublisher};

pub use record_store::prelude::*;

pub use anyhow;
pub use tokio;
