//! Broker wire representation of messages.
//!
//! The wire types model optional fields as `Option`, matching the AMQP
//! message shape the broker SDK exposes: "unset" is distinguishable from an
//! empty value. Application property values are a tagged variant so inbound
//! mapping stays total for every primitive type the broker can deliver.

use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

// ============================================================================
// Application Property Values
// ============================================================================

/// A broker application-property value of any primitive wire type
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Binary(Bytes),
    Timestamp(DateTime<Utc>),
}

impl PropertyValue {
    /// Canonical textual rendering, total for every variant.
    ///
    /// Strings pass through unchanged; binary values are base64; timestamps
    /// render as RFC 3339.
    pub fn as_text(&self) -> String {
        match self {
            Self::Str(value) => value.clone(),
            Self::Int(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Bool(value) => value.to_string(),
            Self::Binary(value) => general_purpose::STANDARD.encode(value),
            Self::Timestamp(value) => value.to_rfc3339(),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

// ============================================================================
// Outbound Wire Messages
// ============================================================================

/// The broker's native outbound message shape
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireMessage {
    /// Nil means no property section at all; an allocated empty map is legal
    /// but never produced by the mapper.
    pub application_properties: Option<HashMap<String, PropertyValue>>,
    pub body: Bytes,
    pub content_type: Option<String>,
    pub correlation_id: Option<String>,
    pub message_id: Option<String>,
    pub partition_key: Option<String>,
    pub reply_to: Option<String>,
    pub reply_to_session_id: Option<String>,
    pub session_id: Option<String>,
    pub subject: Option<String>,
    pub time_to_live: Option<Duration>,
    pub to: Option<String>,
}

impl WireMessage {
    /// Rough wire size in bytes, used by batch capacity accounting
    pub fn estimated_size(&self) -> usize {
        // AMQP header/annotation overhead per message
        const ENVELOPE_OVERHEAD: usize = 64;

        let strings = [
            &self.content_type,
            &self.correlation_id,
            &self.message_id,
            &self.partition_key,
            &self.reply_to,
            &self.reply_to_session_id,
            &self.session_id,
            &self.subject,
            &self.to,
        ];

        let mut size = ENVELOPE_OVERHEAD + self.body.len();
        for field in strings.into_iter().flatten() {
            size += field.len();
        }
        if let Some(properties) = &self.application_properties {
            for (key, value) in properties {
                size += key.len() + value.as_text().len();
            }
        }
        size
    }
}

// ============================================================================
// Inbound Wire Messages
// ============================================================================

/// Delivery state as reported by the broker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WireMessageState {
    #[default]
    Active,
    Deferred,
    Scheduled,
}

/// The broker's native received-message shape, including the lock token the
/// completion primitive needs.
#[derive(Debug, Clone, Default)]
pub struct WireReceivedMessage {
    pub application_properties: Option<HashMap<String, PropertyValue>>,
    pub body: Bytes,
    pub content_type: Option<String>,
    pub correlation_id: Option<String>,
    pub dead_letter_error_description: Option<String>,
    pub dead_letter_reason: Option<String>,
    pub dead_letter_source: Option<String>,
    pub delivery_count: u32,
    pub enqueued_sequence_number: Option<i64>,
    pub enqueued_time: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub lock_token: String,
    pub locked_until: Option<DateTime<Utc>>,
    pub message_id: String,
    pub partition_key: Option<String>,
    pub reply_to: Option<String>,
    pub reply_to_session_id: Option<String>,
    pub scheduled_enqueue_time: Option<DateTime<Utc>>,
    pub sequence_number: Option<i64>,
    pub session_id: Option<String>,
    pub state: WireMessageState,
    pub subject: Option<String>,
    pub time_to_live: Option<Duration>,
    pub to: Option<String>,
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
