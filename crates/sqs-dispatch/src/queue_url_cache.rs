//! Queue URL cache with per-queue single-flight resolution.
//!
//! Entries live for the lifetime of the process. Concurrent misses for the
//! same queue share one `GetQueueUrl` call; misses for different queues do
//! not wait on each other. A failed lookup is not cached.

use crate::client::SqsClient;
use crate::error::SqsError;
use crate::queue_name::QueueName;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::debug;

#[cfg(test)]
#[path = "queue_url_cache_tests.rs"]
mod tests;

/// Memoizes queue URLs keyed by physical queue name
pub struct QueueUrlCache {
    client: Arc<dyn SqsClient>,
    entries: RwLock<HashMap<QueueName, Arc<OnceCell<String>>>>,
}

impl QueueUrlCache {
    pub fn new(client: Arc<dyn SqsClient>) -> Self {
        Self {
            client,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve the URL of a queue, calling SQS at most once per queue
    pub async fn get_queue_url(&self, queue_name: &QueueName) -> Result<String, SqsError> {
        let cell = self.entry(queue_name).await;

        if let Some(url) = cell.get() {
            debug!(queue = %queue_name, "Queue URL cache hit");
            return Ok(url.clone());
        }

        let url = cell
            .get_or_try_init(|| async {
                debug!(queue = %queue_name, "Queue URL cache miss, resolving");
                self.client.get_queue_url(queue_name).await
            })
            .await?;

        Ok(url.clone())
    }

    /// Cached URL without resolving
    pub async fn cached_url(&self, queue_name: &QueueName) -> Option<String> {
        self.entries
            .read()
            .await
            .get(queue_name)
            .and_then(|cell| cell.get().cloned())
    }

    async fn entry(&self, queue_name: &QueueName) -> Arc<OnceCell<String>> {
        let existing = self.entries.read().await.get(queue_name).cloned();
        if let Some(cell) = existing {
            return cell;
        }

        let mut entries = self.entries.write().await;
        entries
            .entry(queue_name.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }
}

impl std::fmt::Debug for QueueUrlCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueUrlCache").finish_non_exhaustive()
    }
}
