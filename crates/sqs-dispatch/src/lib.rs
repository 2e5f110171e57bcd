//! # SQS Dispatch
//!
//! Outbound delivery path for an Amazon SQS message transport.
//!
//! This library provides:
//! - Concurrent dispatch of batches of outgoing operations
//! - Large message offload to S3 when the wire envelope exceeds 256 KiB
//! - Native short delays and routed long delays via a FIFO delay queue
//! - Queue URL resolution with a single-flight, process-lifetime cache
//! - A JSON wire envelope shared with the receive side
//!
//! ## Module Organization
//!
//! - [error] - Error types for dispatch operations
//! - [message] - Outgoing messages, delivery constraints and identifiers
//! - [config] - Transport configuration and loading
//! - [client] - SQS and blob storage client traits
//! - [providers] - HTTP and in-memory client implementations
//! - [queue_name] - Logical to physical queue name mapping
//! - [queue_url_cache] - Single-flight queue URL cache
//! - [wire] - Wire envelope codec
//! - [offload] - Large message offload
//! - [delay] - Delay scheduling decisions
//! - [dispatcher] - Batch dispatcher

pub mod client;
pub mod config;
pub mod delay;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod offload;
pub mod providers;
pub mod queue_name;
pub mod queue_url_cache;
pub mod wire;

mod signing;

// Re-export commonly used types at crate root for convenience
pub use client::{
    BlobStore, Deduplication, MessageAttributeValue, SendMessageRequest, SqsClient,
};
pub use config::{AwsConfig, DelayedDeliveryConfig, S3Config, TransportConfig};
pub use delay::{DelayDecision, DelayPolicy, RoutedDelay};
pub use dispatcher::MessageDispatcher;
pub use error::{
    BlobStorageError, ConfigurationError, DispatchError, SerializationError, SqsError,
    ValidationError,
};
pub use message::{DeliveryConstraint, MessageId, OutgoingMessage, OutgoingOperation, Timestamp};
pub use providers::{InMemoryBlobStore, InMemorySqsClient, S3BlobStore, SqsHttpClient};
pub use queue_name::QueueName;
pub use queue_url_cache::QueueUrlCache;
pub use wire::{BodyContent, WireEnvelope};
