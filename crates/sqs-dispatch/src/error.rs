//! Error types for dispatch operations.

use chrono::Duration;
use thiserror::Error;

/// Top-level error returned by the dispatcher
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(
        "Cannot send a message delayed by {requested} because the maximum native SQS delay is \
         {maximum}. Enable unrestricted delayed delivery to send messages with longer delays"
    )]
    UnsupportedDelay {
        requested: Duration,
        maximum: Duration,
    },

    #[error(
        "Cannot send large message '{message_id}' ({size} bytes) because no S3 bucket was \
         configured. Add an S3 bucket name to the large message configuration"
    )]
    OffloadNotConfigured { message_id: String, size: usize },

    #[error(
        "Destination '{destination}' doesn't support delayed messages longer than {threshold}. \
         To enable support for longer delays, enable unrestricted delayed delivery on the \
         '{destination}' endpoint"
    )]
    DelayedDeliveryNotEnabled {
        destination: String,
        threshold: Duration,
        #[source]
        source: SqsError,
    },

    #[error("Failed to send message to '{destination}': {source}")]
    Sqs {
        destination: String,
        #[source]
        source: SqsError,
    },

    #[error("Failed to upload message body to '{bucket}/{key}': {source}")]
    Offload {
        bucket: String,
        key: String,
        #[source]
        source: BlobStorageError,
    },

    #[error("Dispatch task failed: {message}")]
    TaskFailed { message: String },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] SerializationError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl DispatchError {
    /// Check if error is transient and the caller may retry the dispatch
    pub fn is_transient(&self) -> bool {
        match self {
            Self::UnsupportedDelay { .. } => false,
            Self::OffloadNotConfigured { .. } => false,
            Self::DelayedDeliveryNotEnabled { .. } => false,
            Self::Sqs { source, .. } => source.is_transient(),
            Self::Offload { source, .. } => source.is_transient(),
            Self::TaskFailed { .. } => false,
            Self::Serialization(_) => false,
            Self::Configuration(_) => false,
            Self::Validation(_) => false,
        }
    }

    /// Logical destination the failure relates to, when known
    pub fn destination(&self) -> Option<&str> {
        match self {
            Self::DelayedDeliveryNotEnabled { destination, .. } | Self::Sqs { destination, .. } => {
                Some(destination)
            }
            _ => None,
        }
    }
}

/// Errors returned by SQS client implementations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqsError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("SQS service error: {0}")]
    ServiceError(String),

    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SqsError {
    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Authentication(_) => false,
            Self::NetworkError(_) => true,
            Self::ServiceError(_) => true, // Most SQS errors are transient
            Self::QueueNotFound(_) => false,
            Self::ConfigurationError(_) => false,
            Self::SerializationError(_) => false,
        }
    }
}

/// Errors returned by blob storage implementations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlobStorageError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("Storage service error: {0}")]
    ServiceError(String),

    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),
}

impl BlobStorageError {
    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NetworkError(_) | Self::ServiceError(_))
    }
}

/// Errors during wire envelope serialization/deserialization
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("JSON serialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Message body is not valid base64: {0}")]
    InvalidBody(#[from] base64::DecodeError),

    #[error("Poison message: {reason}")]
    PoisonMessage { reason: String },
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration parsing failed: {message}")]
    Parsing { message: String },
}

/// Validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
