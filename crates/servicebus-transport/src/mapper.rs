//! Pure bidirectional mapping between generic records and wire messages.
//!
//! Both directions are total: they perform no I/O, cannot block, and cannot
//! fail for well-formed input. Inbound application properties of non-string
//! wire types are rendered through [`PropertyValue::as_text`] instead of
//! being rejected.

use crate::message::{MessageState, OutboundMessage, ReceivedMessage};
use crate::wire::{PropertyValue, WireMessage, WireMessageState, WireReceivedMessage};
use bytes::Bytes;
use std::collections::HashMap;

/// Map a generic outbound message to the broker wire shape.
///
/// Field rules, in order:
/// 1. application properties are copied into a freshly allocated wire map,
///    only when at least one is present;
/// 2. `body` bytes, when present;
/// 3. `body_as_string` overwrites the body with its UTF-8 bytes (later-wins);
/// 4. each optional field transfers as-is — absent stays unset on the wire,
///    never set-to-empty;
/// 5. `time_to_live` transfers as an optional wire duration.
pub fn to_wire(message: &OutboundMessage) -> WireMessage {
    let mut wire = WireMessage::default();

    if !message.application_properties.is_empty() {
        let mut properties = HashMap::with_capacity(message.application_properties.len());
        for (key, value) in &message.application_properties {
            properties.insert(key.clone(), PropertyValue::Str(value.clone()));
        }
        wire.application_properties = Some(properties);
    }

    if let Some(body) = &message.body {
        wire.body = body.clone();
    }

    if let Some(text) = &message.body_as_string {
        wire.body = Bytes::from(text.clone().into_bytes());
    }

    wire.content_type = message.content_type.clone();
    wire.correlation_id = message.correlation_id.clone();
    wire.message_id = message.message_id.clone();
    wire.partition_key = message.partition_key.clone();
    wire.reply_to = message.reply_to.clone();
    wire.reply_to_session_id = message.reply_to_session_id.clone();
    wire.session_id = message.session_id.clone();
    wire.subject = message.subject.clone();
    wire.time_to_live = message.time_to_live;
    wire.to = message.to.clone();

    wire
}

/// Map a received wire message back to the generic record.
///
/// The body is exposed both verbatim and as lossily decoded UTF-8 text.
/// Optional wire fields that were never set stay `None`; application property
/// values are rendered to their canonical text form.
pub fn from_wire(wire: &WireReceivedMessage) -> ReceivedMessage {
    let application_properties = match &wire.application_properties {
        Some(properties) => properties
            .iter()
            .map(|(key, value)| (key.clone(), value.as_text()))
            .collect(),
        None => HashMap::new(),
    };

    let state = match wire.state {
        WireMessageState::Active => MessageState::Active,
        WireMessageState::Deferred => MessageState::Deferred,
        WireMessageState::Scheduled => MessageState::Scheduled,
    };

    ReceivedMessage {
        application_properties,
        body: wire.body.clone(),
        body_as_string: String::from_utf8_lossy(&wire.body).into_owned(),
        content_type: wire.content_type.clone(),
        correlation_id: wire.correlation_id.clone(),
        dead_letter_error_description: wire.dead_letter_error_description.clone(),
        dead_letter_reason: wire.dead_letter_reason.clone(),
        dead_letter_source: wire.dead_letter_source.clone(),
        delivery_count: wire.delivery_count,
        enqueued_sequence_number: wire.enqueued_sequence_number,
        enqueued_time: wire.enqueued_time,
        expires_at: wire.expires_at,
        locked_until: wire.locked_until,
        message_id: wire.message_id.clone(),
        partition_key: wire.partition_key.clone(),
        reply_to: wire.reply_to.clone(),
        reply_to_session_id: wire.reply_to_session_id.clone(),
        scheduled_enqueue_time: wire.scheduled_enqueue_time,
        sequence_number: wire.sequence_number,
        session_id: wire.session_id.clone(),
        state,
        subject: wire.subject.clone(),
        time_to_live: wire.time_to_live,
        to: wire.to.clone(),
    }
}

#[cfg(test)]
#[path = "mapper_tests.rs"]
mod tests;
