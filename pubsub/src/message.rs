//! Messages and their stream entry encoding
//!
//! A message is stored as one stream entry: the payload under `data` and each
//! attribute under `attr:<name>`.

use crate::errors::PubSubError;
use redis::Value;
use std::collections::{BTreeMap, HashMap};

const DATA_FIELD: &str = "data";
const ATTRIBUTE_PREFIX: &str = "attr:";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PubSubMessage {
    /// Stream entry id; empty until the message is published.
    pub id: String,
    pub data: Vec<u8>,
    pub attributes: BTreeMap<String, String>,
}

impl PubSubMessage {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Field/value pairs for `XADD`.
    pub(crate) fn to_fields(&self) -> Vec<(String, Vec<u8>)> {
        let mut fields = Vec::with_capacity(self.attributes.len() + 1);
        fields.push((DATA_FIELD.to_string(), self.data.clone()));
        for (name, value) in &self.attributes {
            fields.push((
                format!("{}{}", ATTRIBUTE_PREFIX, name),
                value.clone().into_bytes(),
            ));
        }
        fields
    }

    /// Rebuild a message from a stream entry read back with `XREADGROUP`.
    pub(crate) fn from_fields(
        id: String,
        fields: &HashMap<String, Value>,
    ) -> Result<Self, PubSubError> {
        let malformed = |reason: String| PubSubError::MalformedMessage {
            id: id.clone(),
            reason,
        };

        let mut message = PubSubMessage::default();
        for (field, value) in fields {
            if field == DATA_FIELD {
                message.data = redis::from_redis_value(value)
                    .map_err(|e| malformed(format!("data: {}", e)))?;
            } else if let Some(name) = field.strip_prefix(ATTRIBUTE_PREFIX) {
                let value: String = redis::from_redis_value(value)
                    .map_err(|e| malformed(format!("attribute {}: {}", name, e)))?;
                message.attributes.insert(name.to_string(), value);
            }
        }

        message.id = id;
        Ok(message)
    }
}
