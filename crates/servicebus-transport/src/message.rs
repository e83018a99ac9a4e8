//! Generic message records exchanged with the caller.
//!
//! These records are deliberately broker-agnostic: every optional wire field is
//! an `Option`, so "never set" and "set to an empty string" stay distinct all
//! the way to the wire. The scripting boundary that originally motivated this
//! layer could not express that difference; the Rust surface can, and does.

use crate::error::ValidationError;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

// ============================================================================
// Entity Names
// ============================================================================

/// Validated queue, topic, or subscription name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityName(String);

impl EntityName {
    /// Create new entity name with validation
    pub fn new(name: String) -> Result<Self, ValidationError> {
        if name.is_empty() || name.len() > 260 {
            return Err(ValidationError::OutOfRange {
                field: "entity_name".to_string(),
                message: "must be 1-260 characters".to_string(),
            });
        }

        // ASCII alphanumeric plus the separators Service Bus entities allow
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'))
        {
            return Err(ValidationError::InvalidFormat {
                field: "entity_name".to_string(),
                message: "only ASCII alphanumeric, hyphens, underscores, dots, and slashes allowed"
                    .to_string(),
            });
        }

        if name.starts_with('/') || name.ends_with('/') {
            return Err(ValidationError::InvalidFormat {
                field: "entity_name".to_string(),
                message: "no leading or trailing slashes".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get entity name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

// ============================================================================
// Message State
// ============================================================================

/// Delivery state of a received message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageState {
    Active,
    Deferred,
    Scheduled,
}

impl std::fmt::Display for MessageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Deferred => write!(f, "deferred"),
            Self::Scheduled => write!(f, "scheduled"),
        }
    }
}

// ============================================================================
// Outbound Messages
// ============================================================================

/// A message to be sent through the transport.
///
/// Constructed per send call and consumed once by the mapper. `body_as_string`
/// takes precedence over `body` when both are supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutboundMessage {
    pub application_properties: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub body_as_string: Option<String>,
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

impl OutboundMessage {
    /// Create new empty message
    pub fn new() -> Self {
        Self::default()
    }

    /// Set raw body bytes
    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    /// Set body from text (overrides raw bytes during mapping)
    pub fn with_body_text(mut self, text: impl Into<String>) -> Self {
        self.body_as_string = Some(text.into());
        self
    }

    /// Add application property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.application_properties.insert(key.into(), value.into());
        self
    }

    /// Set content type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set correlation ID for tracking
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Set explicit message ID (broker assigns one otherwise)
    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Set partition key for partitioned entities
    pub fn with_partition_key(mut self, partition_key: impl Into<String>) -> Self {
        self.partition_key = Some(partition_key.into());
        self
    }

    /// Set reply-to address
    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    /// Set reply-to session ID
    pub fn with_reply_to_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.reply_to_session_id = Some(session_id.into());
        self
    }

    /// Set session ID for session-enabled entities
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set subject (label)
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set time-to-live for message expiration
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    /// Set the `to` address
    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }
}

// ============================================================================
// Received Messages
// ============================================================================

/// A message received from the broker.
///
/// By the time the caller holds one of these, the message has already been
/// completed (acknowledged) at the broker — the record carries no handle back
/// and cannot be abandoned or re-delivered.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub application_properties: HashMap<String, String>,
    pub body: Bytes,
    pub body_as_string: String,
    pub content_type: Option<String>,
    pub correlation_id: Option<String>,
    pub dead_letter_error_description: Option<String>,
    pub dead_letter_reason: Option<String>,
    pub dead_letter_source: Option<String>,
    pub delivery_count: u32,
    pub enqueued_sequence_number: Option<i64>,
    pub enqueued_time: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub locked_until: Option<DateTime<Utc>>,
    pub message_id: String,
    pub partition_key: Option<String>,
    pub reply_to: Option<String>,
    pub reply_to_session_id: Option<String>,
    pub scheduled_enqueue_time: Option<DateTime<Utc>>,
    pub sequence_number: Option<i64>,
    pub session_id: Option<String>,
    pub state: MessageState,
    pub subject: Option<String>,
    pub time_to_live: Option<Duration>,
    pub to: Option<String>,
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
