//! Tests for message records and entity names.

use super::*;

#[test]
fn test_entity_name_accepts_queue_and_subscription_paths() {
    assert!(EntityName::new("orders".to_string()).is_ok());
    assert!(EntityName::new("orders-v2".to_string()).is_ok());
    assert!(EntityName::new("region.east/orders".to_string()).is_ok());
}

#[test]
fn test_entity_name_rejects_invalid_input() {
    assert!(EntityName::new(String::new()).is_err());
    assert!(EntityName::new("a".repeat(261)).is_err());
    assert!(EntityName::new("orders queue".to_string()).is_err());
    assert!(EntityName::new("/orders".to_string()).is_err());
    assert!(EntityName::new("orders/".to_string()).is_err());
}

#[test]
fn test_entity_name_from_str() {
    let name: EntityName = "invoices".parse().unwrap();
    assert_eq!(name.as_str(), "invoices");
    assert!("bad name".parse::<EntityName>().is_err());
}

#[test]
fn test_outbound_message_builder() {
    let message = OutboundMessage::new()
        .with_body(Bytes::from_static(b"raw"))
        .with_body_text("text form")
        .with_property("tenant", "contoso")
        .with_content_type("text/plain")
        .with_correlation_id("corr-1")
        .with_message_id("msg-1")
        .with_partition_key("pk-1")
        .with_session_id("sess-1")
        .with_subject("greeting")
        .with_ttl(Duration::minutes(5))
        .with_to("forwarding-target");

    assert_eq!(message.body, Some(Bytes::from_static(b"raw")));
    assert_eq!(message.body_as_string.as_deref(), Some("text form"));
    assert_eq!(
        message.application_properties.get("tenant"),
        Some(&"contoso".to_string())
    );
    assert_eq!(message.content_type.as_deref(), Some("text/plain"));
    assert_eq!(message.time_to_live, Some(Duration::minutes(5)));
    // Untouched fields stay absent, not empty
    assert_eq!(message.reply_to, None);
}

#[test]
fn test_outbound_message_default_is_fully_unset() {
    let message = OutboundMessage::new();
    assert!(message.application_properties.is_empty());
    assert_eq!(message.body, None);
    assert_eq!(message.body_as_string, None);
    assert_eq!(message.content_type, None);
    assert_eq!(message.time_to_live, None);
}

#[test]
fn test_message_state_serde_lowercase() {
    assert_eq!(
        serde_json::to_string(&MessageState::Active).unwrap(),
        "\"active\""
    );
    assert_eq!(
        serde_json::from_str::<MessageState>("\"deferred\"").unwrap(),
        MessageState::Deferred
    );
    assert_eq!(MessageState::Scheduled.to_string(), "scheduled");
}
