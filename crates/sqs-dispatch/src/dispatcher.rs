//! Batch dispatcher.
//!
//! Each operation in a batch runs as its own task: the delay decision is
//! made, the message is encoded, oversized bodies are offloaded and the
//! envelope is sent to the resolved queue. The batch waits for every task;
//! one failure never cancels the others.

use crate::client::{BlobStore, MessageAttributeValue, SendMessageRequest, SqsClient};
use crate::config::TransportConfig;
use crate::delay::{self, DelayDecision, DelayPolicy, RoutedDelay, DELAY_DUE_TIME_ATTRIBUTE};
use crate::error::{ConfigurationError, DispatchError, SqsError};
use crate::message::OutgoingOperation;
use crate::offload::LargeMessageOffload;
use crate::providers::{S3BlobStore, SqsHttpClient};
use crate::queue_name::QueueName;
use crate::queue_url_cache::QueueUrlCache;
use crate::wire::WireEnvelope;
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument};

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;

/// Sends batches of outgoing operations to SQS
///
/// Cloning is cheap; clones share the queue URL cache and clients.
#[derive(Clone)]
pub struct MessageDispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    sqs: Arc<dyn SqsClient>,
    queue_urls: QueueUrlCache,
    offload: LargeMessageOffload,
    delay_policy: DelayPolicy,
    queue_name_prefix: String,
}

impl MessageDispatcher {
    /// Create a dispatcher over explicit clients
    ///
    /// `blob_store` is only used when `config.large_messages` is set.
    pub fn new(
        config: &TransportConfig,
        sqs: Arc<dyn SqsClient>,
        blob_store: Option<Arc<dyn BlobStore>>,
    ) -> Self {
        let inner = DispatcherInner {
            queue_urls: QueueUrlCache::new(sqs.clone()),
            sqs,
            offload: LargeMessageOffload::new(config.large_messages.clone(), blob_store),
            delay_policy: DelayPolicy::from(&config.delayed_delivery),
            queue_name_prefix: config.queue_name_prefix.clone(),
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Create a dispatcher backed by the HTTP SQS and S3 clients
    pub fn from_config(config: &TransportConfig) -> Result<Self, DispatchError> {
        config.validate()?;

        let sqs = SqsHttpClient::new(&config.aws).map_err(|e| ConfigurationError::Invalid {
            message: e.to_string(),
        })?;

        let blob_store: Option<Arc<dyn BlobStore>> = match config.large_messages {
            Some(_) => {
                let store: Arc<dyn BlobStore> = Arc::new(S3BlobStore::new(&config.aws).map_err(
                    |e| ConfigurationError::Invalid {
                        message: e.to_string(),
                    },
                )?);
                Some(store)
            }
            None => None,
        };

        Ok(Self::new(config, Arc::new(sqs), blob_store))
    }

    /// Dispatch a batch of operations concurrently
    ///
    /// Every operation is attempted. Each failure is logged with its
    /// destination and the first failure in batch order is returned.
    /// Operations that succeeded are not rolled back.
    ///
    /// Dropping the returned future aborts all in-flight operations.
    #[instrument(skip(self, operations), fields(operations = operations.len()))]
    pub async fn dispatch(&self, operations: Vec<OutgoingOperation>) -> Result<(), DispatchError> {
        if operations.is_empty() {
            debug!("Empty batch, nothing to dispatch");
            return Ok(());
        }

        let total = operations.len();
        let mut tasks = JoinSet::new();
        for (index, operation) in operations.into_iter().enumerate() {
            let inner = self.inner.clone();
            tasks.spawn(async move {
                let result = inner.dispatch_operation(&operation).await;
                (index, operation, result)
            });
        }

        let mut failures: Vec<(usize, DispatchError)> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, _, Ok(()))) => {}
                Ok((index, operation, Err(err))) => {
                    error!(
                        destination = %operation.destination,
                        message_id = %operation.message.message_id,
                        error = %err,
                        "Failed to dispatch message"
                    );
                    failures.push((index, err));
                }
                Err(join_error) => {
                    error!(error = %join_error, "Dispatch task did not complete");
                    // The index of a panicked task is unknown, so it sorts last
                    failures.push((
                        usize::MAX,
                        DispatchError::TaskFailed {
                            message: join_error.to_string(),
                        },
                    ));
                }
            }
        }

        if failures.is_empty() {
            info!(operations = total, "Dispatched batch");
            return Ok(());
        }

        failures.sort_by_key(|(index, _)| *index);
        error!(
            failed = failures.len(),
            operations = total,
            "Batch dispatch failed"
        );

        let (_, first) = failures.swap_remove(0);
        Err(first)
    }

    /// Dispatch a single operation on the current task
    #[instrument(skip(self, operation), fields(
        destination = %operation.destination,
        message_id = %operation.message.message_id
    ))]
    pub async fn dispatch_operation(
        &self,
        operation: &OutgoingOperation,
    ) -> Result<(), DispatchError> {
        self.inner.dispatch_operation(operation).await
    }
}

impl std::fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDispatcher")
            .field("queue_name_prefix", &self.inner.queue_name_prefix)
            .field("delay_policy", &self.inner.delay_policy)
            .field("offload_configured", &self.inner.offload.is_configured())
            .finish()
    }
}

impl DispatcherInner {
    async fn dispatch_operation(&self, operation: &OutgoingOperation) -> Result<(), DispatchError> {
        let message = &operation.message;

        // Fatal checks run before any network call
        let decision = delay::decide(
            &message.message_id,
            &operation.delivery_constraints,
            Utc::now(),
            &self.delay_policy,
        )?;
        let queue_name = match decision {
            DelayDecision::Routed(ref routed) => QueueName::physical(
                &format!("{}{}", operation.destination, routed.queue_suffix),
                &self.queue_name_prefix,
            )?,
            _ => QueueName::physical(&operation.destination, &self.queue_name_prefix)?,
        };

        let envelope = WireEnvelope::encode(message, &operation.delivery_constraints);
        let body = self.offload.prepare(envelope, message).await?;

        match decision {
            DelayDecision::Routed(routed) => {
                self.send_routed(operation, &queue_name, body, routed).await
            }
            DelayDecision::Inline { seconds } => {
                self.send_direct(operation, &queue_name, body, Some(seconds))
                    .await
            }
            DelayDecision::None => self.send_direct(operation, &queue_name, body, None).await,
        }
    }

    async fn send_direct(
        &self,
        operation: &OutgoingOperation,
        queue_name: &QueueName,
        body: String,
        delay_seconds: Option<u32>,
    ) -> Result<(), DispatchError> {
        let sqs_error = |source: SqsError| DispatchError::Sqs {
            destination: operation.destination.clone(),
            source,
        };

        let queue_url = self
            .queue_urls
            .get_queue_url(queue_name)
            .await
            .map_err(sqs_error)?;

        let mut request = SendMessageRequest::new(queue_url, body);
        if let Some(seconds) = delay_seconds {
            request = request.with_delay_seconds(seconds);
        }

        self.sqs.send_message(request).await.map_err(sqs_error)?;

        debug!(
            queue = %queue_name,
            delay_seconds = delay_seconds.unwrap_or(0),
            "Sent message"
        );
        Ok(())
    }

    async fn send_routed(
        &self,
        operation: &OutgoingOperation,
        queue_name: &QueueName,
        body: String,
        routed: RoutedDelay,
    ) -> Result<(), DispatchError> {
        let threshold = self.delay_policy.routed_delay_threshold;
        let translate = |source: SqsError| match source {
            SqsError::QueueNotFound(_) => DispatchError::DelayedDeliveryNotEnabled {
                destination: operation.destination.clone(),
                threshold,
                source,
            },
            source => DispatchError::Sqs {
                destination: operation.destination.clone(),
                source,
            },
        };

        let queue_url = self
            .queue_urls
            .get_queue_url(queue_name)
            .await
            .map_err(translate)?;

        let request = SendMessageRequest::new(queue_url, body)
            .with_attribute(
                DELAY_DUE_TIME_ATTRIBUTE,
                MessageAttributeValue::string(routed.due.to_wire_format()),
            )
            .with_deduplication(routed.deduplication_id, routed.group_id);

        self.sqs.send_message(request).await.map_err(translate)?;

        debug!(
            queue = %queue_name,
            due = %routed.due,
            "Sent message through delay queue"
        );
        Ok(())
    }
}
