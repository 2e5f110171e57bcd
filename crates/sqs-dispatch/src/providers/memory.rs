//! In-memory SQS and blob store implementations for testing and development.
//!
//! [`InMemorySqsClient`] knows only the queues registered with it and records
//! every message sent, so tests can assert on exactly what reached SQS.
//! [`InMemoryBlobStore`] keeps objects in a map keyed by bucket and key.

use crate::client::{BlobStore, SendMessageRequest, SqsClient};
use crate::error::{BlobStorageError, SqsError};
use crate::queue_name::QueueName;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

const QUEUE_URL_BASE: &str = "https://sqs.in-memory.local/000000000000";

/// In-memory SQS client
#[derive(Default)]
pub struct InMemorySqsClient {
    queues: RwLock<HashMap<String, String>>,
    sent: RwLock<Vec<SendMessageRequest>>,
    send_failures: RwLock<HashMap<String, SqsError>>,
    lookups: AtomicUsize,
    lookup_latency: Option<Duration>,
}

impl InMemorySqsClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every queue URL lookup, widening race windows in tests
    pub fn with_lookup_latency(mut self, latency: Duration) -> Self {
        self.lookup_latency = Some(latency);
        self
    }

    /// URL assigned to a physical queue name
    pub fn queue_url_for(queue_name: &str) -> String {
        format!("{}/{}", QUEUE_URL_BASE, queue_name)
    }

    /// Create a queue, returning its URL
    pub async fn register_queue(&self, queue_name: &str) -> String {
        let url = Self::queue_url_for(queue_name);
        self.queues
            .write()
            .await
            .insert(queue_name.to_string(), url.clone());
        url
    }

    /// Make every send to the named queue fail with `error`
    pub async fn fail_sends_to(&self, queue_name: &str, error: SqsError) {
        self.send_failures
            .write()
            .await
            .insert(Self::queue_url_for(queue_name), error);
    }

    /// All successfully sent requests in send order
    pub async fn sent_messages(&self) -> Vec<SendMessageRequest> {
        self.sent.read().await.clone()
    }

    /// Successfully sent requests for one physical queue
    pub async fn sent_to(&self, queue_name: &str) -> Vec<SendMessageRequest> {
        let url = Self::queue_url_for(queue_name);
        self.sent
            .read()
            .await
            .iter()
            .filter(|request| request.queue_url == url)
            .cloned()
            .collect()
    }

    /// Number of `get_queue_url` calls made so far
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SqsClient for InMemorySqsClient {
    async fn get_queue_url(&self, queue_name: &QueueName) -> Result<String, SqsError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.lookup_latency {
            tokio::time::sleep(latency).await;
        }

        self.queues
            .read()
            .await
            .get(queue_name.as_str())
            .cloned()
            .ok_or_else(|| {
                SqsError::QueueNotFound(format!("The specified queue does not exist: {}", queue_name))
            })
    }

    async fn send_message(&self, request: SendMessageRequest) -> Result<String, SqsError> {
        if let Some(error) = self.send_failures.read().await.get(&request.queue_url) {
            return Err(error.clone());
        }

        let known = self
            .queues
            .read()
            .await
            .values()
            .any(|url| url == &request.queue_url);
        if !known {
            return Err(SqsError::QueueNotFound(format!(
                "The specified queue does not exist: {}",
                request.queue_url
            )));
        }

        self.sent.write().await.push(request);
        Ok(uuid::Uuid::new_v4().to_string())
    }
}

/// In-memory blob store
#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: RwLock<HashMap<(String, String), Bytes>>,
    put_failure: RwLock<Option<BlobStorageError>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent put fail with `error`
    pub async fn fail_puts_with(&self, error: BlobStorageError) {
        *self.put_failure.write().await = Some(error);
    }

    /// Stored object, if any
    pub async fn get_object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
    ) -> Result<(), BlobStorageError> {
        if let Some(ref error) = *self.put_failure.read().await {
            return Err(error.clone());
        }

        self.objects
            .write()
            .await
            .insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }
}
