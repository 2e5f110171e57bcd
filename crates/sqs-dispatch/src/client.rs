//! Client traits for the remote services the dispatcher talks to.
//!
//! The dispatcher only depends on these traits, so tests and development
//! setups can swap the HTTP implementations in [`crate::providers`] for the
//! in-memory ones.

use crate::error::{BlobStorageError, SqsError};
use crate::queue_name::QueueName;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

/// Maximum native SQS delivery delay in seconds
pub const MAX_DELAY_SECONDS: u32 = crate::delay::MAX_NATIVE_DELAY_SECONDS as u32;

/// Interface implemented by SQS clients
#[async_trait]
pub trait SqsClient: Send + Sync {
    /// Resolve the URL of a physical queue
    ///
    /// Returns [`SqsError::QueueNotFound`] if the queue does not exist.
    async fn get_queue_url(&self, queue_name: &QueueName) -> Result<String, SqsError>;

    /// Send a single message, returning the provider-assigned message id
    async fn send_message(&self, request: SendMessageRequest) -> Result<String, SqsError>;
}

/// Interface implemented by blob stores used for large message bodies
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `body` under `key` in `bucket`, overwriting any existing object
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes)
        -> Result<(), BlobStorageError>;
}

/// Typed SQS message attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAttributeValue {
    pub string_value: String,
    pub data_type: String,
}

impl MessageAttributeValue {
    /// Attribute with the `String` data type
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            string_value: value.into(),
            data_type: "String".to_string(),
        }
    }
}

/// FIFO deduplication and ordering identifiers, always sent together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduplication {
    pub deduplication_id: String,
    pub group_id: String,
}

/// Parameters of a single SendMessage call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub queue_url: String,
    pub message_body: String,
    pub delay_seconds: Option<u32>,
    pub message_attributes: BTreeMap<String, MessageAttributeValue>,
    pub deduplication: Option<Deduplication>,
}

impl SendMessageRequest {
    /// Create new request without delay, attributes or deduplication
    pub fn new(queue_url: impl Into<String>, message_body: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            message_body: message_body.into(),
            delay_seconds: None,
            message_attributes: BTreeMap::new(),
            deduplication: None,
        }
    }

    /// Set the native delivery delay, capped at the SQS maximum
    pub fn with_delay_seconds(mut self, seconds: u32) -> Self {
        self.delay_seconds = Some(seconds.min(MAX_DELAY_SECONDS));
        self
    }

    /// Add a message attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: MessageAttributeValue) -> Self {
        self.message_attributes.insert(name.into(), value);
        self
    }

    /// Set deduplication and group ids for FIFO queues
    pub fn with_deduplication(
        mut self,
        deduplication_id: impl Into<String>,
        group_id: impl Into<String>,
    ) -> Self {
        self.deduplication = Some(Deduplication {
            deduplication_id: deduplication_id.into(),
            group_id: group_id.into(),
        });
        self
    }

    /// Query protocol parameters for this request
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("Action".to_string(), "SendMessage".to_string()),
            ("Version".to_string(), "2012-11-05".to_string()),
            ("QueueUrl".to_string(), self.queue_url.clone()),
            ("MessageBody".to_string(), self.message_body.clone()),
        ];

        if let Some(delay) = self.delay_seconds {
            params.push(("DelaySeconds".to_string(), delay.to_string()));
        }

        for (idx, (name, value)) in self.message_attributes.iter().enumerate() {
            let prefix = format!("MessageAttribute.{}", idx + 1);
            params.push((format!("{}.Name", prefix), name.clone()));
            params.push((
                format!("{}.Value.StringValue", prefix),
                value.string_value.clone(),
            ));
            params.push((format!("{}.Value.DataType", prefix), value.data_type.clone()));
        }

        if let Some(ref dedup) = self.deduplication {
            params.push((
                "MessageDeduplicationId".to_string(),
                dedup.deduplication_id.clone(),
            ));
            params.push(("MessageGroupId".to_string(), dedup.group_id.clone()));
        }

        params
    }
}
