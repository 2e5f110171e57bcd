//! Wire envelope codec.
//!
//! Every message travels as a JSON envelope carrying its headers, a base64
//! body (or the S3 key of an offloaded body) and delivery constraint
//! metadata. The receive side decodes the same envelope.

use crate::error::SerializationError;
use crate::message::{self, DeliveryConstraint, OutgoingMessage, MESSAGE_ID_HEADER};
use base64::Engine;
use bytes::Bytes;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;

/// JSON envelope sent as the SQS message body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireEnvelope {
    pub headers: BTreeMap<String, String>,

    /// Base64 message body, empty when offloaded
    #[serde(default)]
    pub body: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_body_key: Option<String>,

    /// Time to be received, formatted as `[d.]hh:mm:ss`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_be_received: Option<String>,

    /// Relative delivery delay in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_delivery_with: Option<i64>,

    /// Absolute not-before instant in wire timestamp format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_not_deliver_before: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_address: Option<String>,
}

/// Where the body of a decoded envelope lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyContent {
    Inline(Bytes),
    Offloaded { key: String },
}

impl WireEnvelope {
    /// Build the envelope for a message and its delivery constraints
    pub fn encode(message: &OutgoingMessage, constraints: &[DeliveryConstraint]) -> Self {
        let mut headers = message.headers.clone();
        headers
            .entry(MESSAGE_ID_HEADER.to_string())
            .or_insert_with(|| message.message_id.as_str().to_string());

        Self {
            headers,
            body: base64::engine::general_purpose::STANDARD.encode(&message.body),
            s3_body_key: None,
            time_to_be_received: message::discard_if_not_received_before(constraints)
                .map(format_time_span),
            delay_delivery_with: message::delay_delivery_with(constraints)
                .map(|delay| delay.num_milliseconds()),
            do_not_deliver_before: message::do_not_deliver_before(constraints)
                .map(|at| at.to_wire_format()),
            reply_to_address: None,
        }
    }

    /// Serialize to the JSON string sent over the wire
    pub fn to_wire(&self) -> Result<String, SerializationError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a received message body
    ///
    /// Anything that is not a conforming envelope is reported as a poison
    /// message so the receive side can move it to the error queue.
    pub fn decode(wire: &str) -> Result<Self, SerializationError> {
        let value: serde_json::Value =
            serde_json::from_str(wire).map_err(|e| SerializationError::PoisonMessage {
                reason: format!("not valid JSON: {}", e),
            })?;

        if value.get("Headers").is_none() {
            return Err(SerializationError::PoisonMessage {
                reason: "missing Headers".to_string(),
            });
        }

        let envelope: WireEnvelope =
            serde_json::from_value(value).map_err(|e| SerializationError::PoisonMessage {
                reason: format!("malformed envelope: {}", e),
            })?;

        if envelope.s3_body_key.is_some() && !envelope.body.is_empty() {
            return Err(SerializationError::PoisonMessage {
                reason: "both Body and S3BodyKey are set".to_string(),
            });
        }

        Ok(envelope)
    }

    /// Message id carried in the headers
    pub fn message_id(&self) -> Option<&str> {
        self.headers.get(MESSAGE_ID_HEADER).map(String::as_str)
    }

    /// Inline body bytes or the key of the offloaded body
    pub fn body_content(&self) -> Result<BodyContent, SerializationError> {
        match self.s3_body_key {
            Some(ref key) => Ok(BodyContent::Offloaded { key: key.clone() }),
            None => {
                let bytes = base64::engine::general_purpose::STANDARD.decode(&self.body)?;
                Ok(BodyContent::Inline(Bytes::from(bytes)))
            }
        }
    }

    /// Replace the inline body with a reference to an offloaded object
    pub fn offload_to(&mut self, key: impl Into<String>) {
        self.s3_body_key = Some(key.into());
        self.body = String::new();
    }
}

fn format_time_span(span: Duration) -> String {
    let total = span.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{}.{:02}:{:02}:{:02}", days, hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}
