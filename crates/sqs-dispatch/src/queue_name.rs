//! Mapping from logical destinations to physical SQS queue names.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Maximum length of an SQS queue name
pub const MAX_QUEUE_NAME_LENGTH: usize = 80;

const FIFO_SUFFIX: &str = ".fifo";

/// Validated physical SQS queue name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueName(String);

impl QueueName {
    /// Derive the physical queue name for a logical destination
    ///
    /// The prefix is prepended unless the destination already carries it.
    /// Characters other than ASCII alphanumerics, hyphens and underscores are
    /// replaced by hyphens, except for a trailing `.fifo` suffix.
    pub fn physical(destination: &str, prefix: &str) -> Result<Self, ValidationError> {
        if destination.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "destination".to_string(),
            });
        }

        let full_name = if !prefix.is_empty() && destination.starts_with(prefix) {
            destination.to_string()
        } else {
            format!("{}{}", prefix, destination)
        };

        if full_name.chars().count() > MAX_QUEUE_NAME_LENGTH {
            return Err(ValidationError::OutOfRange {
                field: "queue_name".to_string(),
                message: format!(
                    "'{}' is longer than {} characters",
                    full_name, MAX_QUEUE_NAME_LENGTH
                ),
            });
        }

        let (base, suffix) = match full_name.strip_suffix(FIFO_SUFFIX) {
            Some(base) => (base, FIFO_SUFFIX),
            None => (full_name.as_str(), ""),
        };

        let sanitized: String = base
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '-'
                }
            })
            .collect();

        Ok(Self(format!("{}{}", sanitized, suffix)))
    }

    /// Check if this is a FIFO queue
    pub fn is_fifo(&self) -> bool {
        self.0.ends_with(FIFO_SUFFIX)
    }

    /// Get queue name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[path = "queue_name_tests.rs"]
mod tests;
