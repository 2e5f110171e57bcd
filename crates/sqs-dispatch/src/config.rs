//! Transport configuration and loading.
//!
//! Configuration is layered with the `config` crate:
//!
//! 1. Built-in defaults (every field carries a serde default)
//! 2. An optional file (YAML, TOML or JSON, picked by extension)
//! 3. Environment variables prefixed `SQS_DISPATCH` with `__` as separator,
//!    e.g. `SQS_DISPATCH__AWS__REGION=eu-west-1`

use crate::delay::MAX_NATIVE_DELAY_SECONDS;
use crate::error::ConfigurationError;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "SQS_DISPATCH";

/// Complete transport configuration consumed by the dispatcher
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Deployment namespace prepended to every logical queue name
    pub queue_name_prefix: String,

    /// AWS connection settings
    pub aws: AwsConfig,

    /// Large message offload to S3 (disabled when absent)
    pub large_messages: Option<S3Config>,

    /// Delayed delivery settings
    pub delayed_delivery: DelayedDeliveryConfig,
}

impl TransportConfig {
    /// Load configuration from an optional file plus environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::Parsing {
                message: e.to_string(),
            })?;

        let config: TransportConfig =
            settings
                .try_deserialize()
                .map_err(|e| ConfigurationError::Parsing {
                    message: e.to_string(),
                })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.aws.validate()?;
        self.delayed_delivery.validate()?;

        if let Some(ref s3) = self.large_messages {
            s3.validate()?;
        }

        Ok(())
    }
}

/// AWS connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    pub region: String,
    /// SQS endpoint override (LocalStack, VPC endpoints)
    pub endpoint_url: Option<String>,
    /// S3 endpoint override
    pub s3_endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub request_timeout_seconds: u64,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint_url: None,
            s3_endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            request_timeout_seconds: 30,
        }
    }
}

impl AwsConfig {
    /// SQS endpoint, either the override or the regional default
    pub fn sqs_endpoint(&self) -> String {
        self.endpoint_url
            .clone()
            .unwrap_or_else(|| format!("https://sqs.{}.amazonaws.com", self.region))
    }

    /// S3 endpoint, either the override or the regional default
    pub fn s3_endpoint(&self) -> String {
        self.s3_endpoint_url
            .clone()
            .unwrap_or_else(|| format!("https://s3.{}.amazonaws.com", self.region))
    }

    /// Access key, secret and optional session token, falling back to the
    /// standard AWS environment variables
    pub fn credentials(&self) -> Option<(String, String, Option<String>)> {
        let access_key = self
            .access_key_id
            .clone()
            .or_else(|| std::env::var("AWS_ACCESS_KEY_ID").ok())?;
        let secret_key = self
            .secret_access_key
            .clone()
            .or_else(|| std::env::var("AWS_SECRET_ACCESS_KEY").ok())?;
        let session_token = self
            .session_token
            .clone()
            .or_else(|| std::env::var("AWS_SESSION_TOKEN").ok());

        Some((access_key, secret_key, session_token))
    }

    /// Per-request timeout for the HTTP clients
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_seconds)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.region.trim().is_empty() {
            return Err(ConfigurationError::Missing {
                key: "aws.region".to_string(),
            });
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigurationError::Invalid {
                message: "aws.request_timeout_seconds must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

/// S3 bucket used for message bodies that exceed the SQS size limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    #[serde(default)]
    pub key_prefix: String,
}

impl S3Config {
    /// Object key for an offloaded message body: `{key_prefix}/{message_id}`
    pub fn object_key(&self, message_id: &str) -> String {
        format!("{}/{}", self.key_prefix.trim_end_matches('/'), message_id)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigurationError::Missing {
                key: "large_messages.bucket".to_string(),
            });
        }

        Ok(())
    }
}

/// Delayed delivery configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayedDeliveryConfig {
    /// Route long delays through the `-delay.fifo` companion queue
    pub enabled: bool,
    /// Delays longer than this are routed when enabled
    pub queue_delay_time_seconds: i64,
}

impl Default for DelayedDeliveryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            queue_delay_time_seconds: MAX_NATIVE_DELAY_SECONDS,
        }
    }
}

impl DelayedDeliveryConfig {
    /// Threshold above which delays are routed through the delay queue
    ///
    /// Saturates when the configured seconds are outside the duration range.
    pub fn queue_delay_time(&self) -> Duration {
        Duration::try_seconds(self.queue_delay_time_seconds).unwrap_or(
            if self.queue_delay_time_seconds < 0 {
                Duration::MIN
            } else {
                Duration::MAX
            },
        )
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.queue_delay_time_seconds <= 0
            || self.queue_delay_time_seconds > MAX_NATIVE_DELAY_SECONDS
        {
            return Err(ConfigurationError::Invalid {
                message: format!(
                    "delayed_delivery.queue_delay_time_seconds must be between 1 and {}, got {}",
                    MAX_NATIVE_DELAY_SECONDS, self.queue_delay_time_seconds
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
