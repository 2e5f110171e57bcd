//! Client implementations.
//!
//! This module contains the HTTP implementations of the [`crate::client`]
//! traits for AWS and in-memory implementations for tests and development.

pub mod memory;
pub mod s3;
pub mod sqs;

pub use memory::{InMemoryBlobStore, InMemorySqsClient};
pub use s3::S3BlobStore;
pub use sqs::SqsHttpClient;
