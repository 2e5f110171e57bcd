//! Delay scheduling decisions.
//!
//! Delays up to the native SQS maximum are applied with `DelaySeconds`.
//! Longer delays either fail or, when delayed delivery is enabled, are routed
//! through the destination's `-delay.fifo` companion queue with the due time
//! carried in a message attribute.

use crate::config::DelayedDeliveryConfig;
use crate::error::{DispatchError, ValidationError};
use crate::message::{self, DeliveryConstraint, MessageId, Timestamp};
use chrono::{DateTime, Duration, Utc};

#[cfg(test)]
#[path = "delay_tests.rs"]
mod tests;

/// Maximum delay SQS applies natively, in seconds
pub const MAX_NATIVE_DELAY_SECONDS: i64 = 900;

/// Suffix of the companion queue used for routed delays
pub const DELAYED_DELIVERY_QUEUE_SUFFIX: &str = "-delay.fifo";

/// Message attribute carrying the due time of a routed delay
pub const DELAY_DUE_TIME_ATTRIBUTE: &str = "DelayDueTime";

/// How a single operation is delayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelayDecision {
    /// Deliver immediately
    None,
    /// Native SQS delay
    Inline { seconds: u32 },
    /// Send through the delay queue
    Routed(RoutedDelay),
}

/// Parameters of a delay routed through the `-delay.fifo` queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedDelay {
    pub queue_suffix: &'static str,
    pub due: Timestamp,
    pub deduplication_id: String,
    pub group_id: String,
}

/// Delayed delivery settings the decision depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayPolicy {
    pub delayed_delivery_enabled: bool,
    pub routed_delay_threshold: Duration,
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self {
            delayed_delivery_enabled: false,
            routed_delay_threshold: max_native_delay(),
        }
    }
}

impl From<&DelayedDeliveryConfig> for DelayPolicy {
    fn from(config: &DelayedDeliveryConfig) -> Self {
        Self {
            delayed_delivery_enabled: config.enabled,
            routed_delay_threshold: config.queue_delay_time(),
        }
    }
}

/// Maximum native SQS delay as a duration
pub fn max_native_delay() -> Duration {
    Duration::seconds(MAX_NATIVE_DELAY_SECONDS)
}

/// Delay requested by the constraints, measured from `now`
///
/// A relative delay wins over an absolute not-before instant. A not-before
/// instant in the past yields zero.
pub fn effective_delay(constraints: &[DeliveryConstraint], now: DateTime<Utc>) -> Duration {
    if let Some(delay) = message::delay_delivery_with(constraints) {
        return delay.max(Duration::zero());
    }

    match message::do_not_deliver_before(constraints) {
        Some(at) => (at.as_datetime() - now).max(Duration::zero()),
        None => Duration::zero(),
    }
}

/// Decide how an operation is delayed
///
/// Fails with [`DispatchError::UnsupportedDelay`] when the delay exceeds the
/// native maximum and delayed delivery is disabled. A delay above the native
/// maximum is routed when enabled, whatever the configured threshold.
pub fn decide(
    message_id: &MessageId,
    constraints: &[DeliveryConstraint],
    now: DateTime<Utc>,
    policy: &DelayPolicy,
) -> Result<DelayDecision, DispatchError> {
    let delay = effective_delay(constraints, now);
    let seconds = round_up_seconds(delay);
    let exceeds_native = seconds > MAX_NATIVE_DELAY_SECONDS;

    if !policy.delayed_delivery_enabled {
        if exceeds_native {
            return Err(DispatchError::UnsupportedDelay {
                requested: delay,
                maximum: max_native_delay(),
            });
        }
    } else if exceeds_native || (seconds > 0 && delay > policy.routed_delay_threshold) {
        let due = now
            .checked_add_signed(delay)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "delay".to_string(),
                message: format!("due time of a delay of {} is not representable", delay),
            })?;

        return Ok(DelayDecision::Routed(RoutedDelay {
            queue_suffix: DELAYED_DELIVERY_QUEUE_SUFFIX,
            due: Timestamp::from_datetime(due),
            deduplication_id: message_id.as_str().to_string(),
            group_id: message_id.as_str().to_string(),
        }));
    }

    if seconds > 0 {
        Ok(DelayDecision::Inline {
            seconds: seconds as u32,
        })
    } else {
        Ok(DelayDecision::None)
    }
}

fn round_up_seconds(delay: Duration) -> i64 {
    let whole = delay.num_seconds();
    if delay.subsec_nanos() > 0 {
        whole + 1
    } else {
        whole
    }
}
