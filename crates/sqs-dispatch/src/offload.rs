//! Large message offload to blob storage.

use crate::client::BlobStore;
use crate::config::S3Config;
use crate::error::DispatchError;
use crate::message::OutgoingMessage;
use crate::wire::WireEnvelope;
use std::sync::Arc;
use tracing::{debug, info};

#[cfg(test)]
#[path = "offload_tests.rs"]
mod tests;

/// Largest serialized envelope SQS accepts, in bytes
pub const MAX_MESSAGE_SIZE: usize = 256 * 1024;

/// Moves bodies of oversized envelopes to blob storage
#[derive(Clone)]
pub struct LargeMessageOffload {
    settings: Option<S3Config>,
    store: Option<Arc<dyn BlobStore>>,
}

impl LargeMessageOffload {
    pub fn new(settings: Option<S3Config>, store: Option<Arc<dyn BlobStore>>) -> Self {
        Self { settings, store }
    }

    /// Offload is possible only with both a bucket and a store
    pub fn is_configured(&self) -> bool {
        self.settings.is_some() && self.store.is_some()
    }

    /// Serialize the envelope, offloading the body first when it is too large
    ///
    /// Envelopes at or below [`MAX_MESSAGE_SIZE`] are returned unchanged and
    /// never touch blob storage.
    pub async fn prepare(
        &self,
        mut envelope: WireEnvelope,
        message: &OutgoingMessage,
    ) -> Result<String, DispatchError> {
        let wire = envelope.to_wire()?;
        if wire.len() <= MAX_MESSAGE_SIZE {
            return Ok(wire);
        }

        let (settings, store) = match (&self.settings, &self.store) {
            (Some(settings), Some(store)) => (settings, store),
            _ => {
                return Err(DispatchError::OffloadNotConfigured {
                    message_id: message.message_id.to_string(),
                    size: wire.len(),
                })
            }
        };

        let key = settings.object_key(message.message_id.as_str());
        debug!(
            message_id = %message.message_id,
            size = wire.len(),
            bucket = %settings.bucket,
            key = %key,
            "Envelope exceeds size limit, offloading body"
        );

        store
            .put_object(&settings.bucket, &key, message.body.clone())
            .await
            .map_err(|source| DispatchError::Offload {
                bucket: settings.bucket.clone(),
                key: key.clone(),
                source,
            })?;

        info!(
            message_id = %message.message_id,
            bucket = %settings.bucket,
            key = %key,
            body_size = message.body.len(),
            "Offloaded message body to S3"
        );

        envelope.offload_to(key);
        Ok(envelope.to_wire()?)
    }
}
