//! Outgoing message types, delivery constraints and core identifiers.

use crate::error::ValidationError;
use bytes::Bytes;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Header carrying the message id inside the wire envelope
pub const MESSAGE_ID_HEADER: &str = "MessageId";

/// Timestamp layout shared with the receive side, e.g. `2026-10-19 08:15:00:123456 Z`
const WIRE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S:%6f Z";

// ============================================================================
// Core Domain Identifiers
// ============================================================================

/// Unique identifier for an outgoing message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Generate new random message ID
    pub fn new() -> Self {
        let id = uuid::Uuid::new_v4();
        Self(id.to_string())
    }

    /// Get message ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "message_id".to_string(),
            });
        }

        Ok(Self(s.to_string()))
    }
}

/// Timestamp wrapper for consistent time handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current time
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create timestamp from DateTime
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get underlying DateTime
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Format for message attributes and envelope metadata
    pub fn to_wire_format(&self) -> String {
        self.0.format(WIRE_TIMESTAMP_FORMAT).to_string()
    }

    /// Parse a timestamp produced by [`Timestamp::to_wire_format`]
    pub fn from_wire_format(value: &str) -> Result<Self, ValidationError> {
        NaiveDateTime::parse_from_str(value, WIRE_TIMESTAMP_FORMAT)
            .map(|naive| Self(naive.and_utc()))
            .map_err(|e| ValidationError::InvalidFormat {
                field: "timestamp".to_string(),
                message: e.to_string(),
            })
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// An application message to be sent through the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub message_id: MessageId,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl OutgoingMessage {
    /// Create new message with body
    pub fn new(message_id: MessageId, body: Bytes) -> Self {
        Self {
            message_id,
            headers: BTreeMap::new(),
            body,
        }
    }

    /// Add message header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// Constraint on when or whether a message may be delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryConstraint {
    /// Deliver after the given delay, measured from dispatch time
    DelayDeliveryWith(Duration),
    /// Deliver no earlier than the given instant
    DoNotDeliverBefore(Timestamp),
    /// Discard if not received within the given time
    DiscardIfNotReceivedBefore(Duration),
}

/// A single message addressed to a logical destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingOperation {
    pub message: OutgoingMessage,
    pub destination: String,
    pub delivery_constraints: Vec<DeliveryConstraint>,
}

impl OutgoingOperation {
    /// Create new operation without delivery constraints
    pub fn new(message: OutgoingMessage, destination: impl Into<String>) -> Self {
        Self {
            message,
            destination: destination.into(),
            delivery_constraints: Vec::new(),
        }
    }

    /// Add a delivery constraint
    pub fn with_constraint(mut self, constraint: DeliveryConstraint) -> Self {
        self.delivery_constraints.push(constraint);
        self
    }

    /// Relative delay requested for this operation, if any
    pub fn delay_delivery_with(&self) -> Option<Duration> {
        delay_delivery_with(&self.delivery_constraints)
    }

    /// Absolute not-before instant requested for this operation, if any
    pub fn do_not_deliver_before(&self) -> Option<Timestamp> {
        do_not_deliver_before(&self.delivery_constraints)
    }
}

pub(crate) fn delay_delivery_with(constraints: &[DeliveryConstraint]) -> Option<Duration> {
    constraints.iter().find_map(|c| match c {
        DeliveryConstraint::DelayDeliveryWith(delay) => Some(*delay),
        _ => None,
    })
}

pub(crate) fn do_not_deliver_before(constraints: &[DeliveryConstraint]) -> Option<Timestamp> {
    constraints.iter().find_map(|c| match c {
        DeliveryConstraint::DoNotDeliverBefore(at) => Some(*at),
        _ => None,
    })
}

pub(crate) fn discard_if_not_received_before(
    constraints: &[DeliveryConstraint],
) -> Option<Duration> {
    constraints.iter().find_map(|c| match c {
        DeliveryConstraint::DiscardIfNotReceivedBefore(ttbr) => Some(*ttbr),
        _ => None,
    })
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
