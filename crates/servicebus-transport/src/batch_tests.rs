//! Tests for capacity-aware batch packing.

use super::*;
use crate::link::WireBatch;
use async_trait::async_trait;
use bytes::Bytes;
use std::any::Any;
use std::sync::Mutex;

/// Batch fake that enforces a byte capacity via the wire size estimate
struct FakeBatch {
    capacity: usize,
    used: usize,
    messages: Vec<WireMessage>,
}

impl WireBatch for FakeBatch {
    fn try_add(&mut self, message: &WireMessage) -> bool {
        let size = message.estimated_size();
        if self.used + size > self.capacity {
            return false;
        }
        self.used += size;
        self.messages.push(message.clone());
        true
    }

    fn len(&self) -> usize {
        self.messages.len()
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// Sender link fake recording every dispatched batch
struct FakeSenderLink {
    batch_capacity: usize,
    sent_batches: Mutex<Vec<Vec<WireMessage>>>,
}

impl FakeSenderLink {
    fn new(batch_capacity: usize) -> Self {
        Self {
            batch_capacity,
            sent_batches: Mutex::new(Vec::new()),
        }
    }

    fn batches(&self) -> Vec<Vec<WireMessage>> {
        self.sent_batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl SenderLink for FakeSenderLink {
    async fn send(&self, _message: &WireMessage) -> Result<(), TransportError> {
        Ok(())
    }

    async fn create_batch(&self) -> Result<Box<dyn WireBatch>, TransportError> {
        Ok(Box::new(FakeBatch {
            capacity: self.batch_capacity,
            used: 0,
            messages: Vec::new(),
        }))
    }

    async fn send_batch(&self, batch: Box<dyn WireBatch>) -> Result<(), TransportError> {
        let fake = batch
            .into_any()
            .downcast::<FakeBatch>()
            .expect("batch from another link");
        self.sent_batches.lock().unwrap().push(fake.messages);
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Message whose estimated wire size is overhead + 100 bytes
fn hundred_byte_message(marker: &str) -> OutboundMessage {
    let mut body = vec![b'.'; 100 - marker.len()];
    body.extend_from_slice(marker.as_bytes());
    OutboundMessage::new().with_body(Bytes::from(body))
}

// One empty message costs 64 estimated bytes, a hundred-byte one 164.
const TWO_MESSAGE_CAPACITY: usize = 350;

#[tokio::test]
async fn test_all_messages_fit_in_one_batch_in_order() {
    let link = FakeSenderLink::new(10_000);
    let builder = BatchBuilder::new(&link, OverflowPolicy::Abort, None);

    let messages = vec![
        hundred_byte_message("m1"),
        hundred_byte_message("m2"),
        hundred_byte_message("m3"),
    ];
    let batches = builder.pack_and_send(&messages).await.unwrap();

    assert_eq!(batches, 1);
    let sent = link.batches();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].len(), 3);
    for (wire, original) in sent[0].iter().zip(&messages) {
        assert_eq!(Some(&wire.body), original.body.as_ref());
    }
}

#[tokio::test]
async fn test_abort_policy_rejected_add_sends_nothing() {
    // Second message no longer fits
    let link = FakeSenderLink::new(200);
    let builder = BatchBuilder::new(&link, OverflowPolicy::Abort, None);

    let messages = vec![
        hundred_byte_message("m1"),
        hundred_byte_message("m2"),
        hundred_byte_message("m3"),
    ];
    let error = builder.pack_and_send(&messages).await.unwrap_err();

    assert!(matches!(
        error,
        TransportError::BatchCapacityExceeded {
            index: 1,
            batched: 1
        }
    ));
    assert!(link.batches().is_empty(), "no batch-send may be issued");
}

#[tokio::test]
async fn test_rollover_policy_splits_preserving_order() {
    let link = FakeSenderLink::new(TWO_MESSAGE_CAPACITY);
    let builder = BatchBuilder::new(&link, OverflowPolicy::Rollover, None);

    let messages = vec![
        hundred_byte_message("m1"),
        hundred_byte_message("m2"),
        hundred_byte_message("m3"),
    ];
    let batches = builder.pack_and_send(&messages).await.unwrap();

    assert_eq!(batches, 2);
    let sent = link.batches();
    assert_eq!(sent[0].len(), 2);
    assert_eq!(sent[1].len(), 1);
    assert!(sent[0][0].body.ends_with(b"m1"));
    assert!(sent[0][1].body.ends_with(b"m2"));
    assert!(sent[1][0].body.ends_with(b"m3"));
}

#[tokio::test]
async fn test_rollover_policy_oversized_message_fails() {
    // Nothing fits even in an empty batch
    let link = FakeSenderLink::new(50);
    let builder = BatchBuilder::new(&link, OverflowPolicy::Rollover, None);

    let error = builder
        .pack_and_send(&[hundred_byte_message("m1")])
        .await
        .unwrap_err();

    assert!(matches!(error, TransportError::MessageTooLarge { index: 0 }));
    assert!(link.batches().is_empty());
}

#[tokio::test]
async fn test_abort_policy_oversized_message_is_too_large() {
    let link = FakeSenderLink::new(50);
    let builder = BatchBuilder::new(&link, OverflowPolicy::Abort, None);

    let error = builder
        .pack_and_send(&[hundred_byte_message("m1")])
        .await
        .unwrap_err();

    // Rejection by an empty batch is reported the same way under both
    // policies.
    assert!(matches!(error, TransportError::MessageTooLarge { index: 0 }));
    assert!(link.batches().is_empty());
}

#[tokio::test]
async fn test_empty_input_issues_no_broker_calls() {
    let link = FakeSenderLink::new(100);
    let builder = BatchBuilder::new(&link, OverflowPolicy::Abort, None);

    let batches = builder.pack_and_send(&[]).await.unwrap();
    assert_eq!(batches, 0);
    assert!(link.batches().is_empty());
}

/// Link whose batch creation never completes, for deadline coverage
struct StalledSenderLink;

#[async_trait]
impl SenderLink for StalledSenderLink {
    async fn send(&self, _message: &WireMessage) -> Result<(), TransportError> {
        std::future::pending().await
    }

    async fn create_batch(&self) -> Result<Box<dyn WireBatch>, TransportError> {
        std::future::pending().await
    }

    async fn send_batch(&self, _batch: Box<dyn WireBatch>) -> Result<(), TransportError> {
        std::future::pending().await
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_deadline_bounds_each_broker_call() {
    let link = StalledSenderLink;
    let builder = BatchBuilder::new(
        &link,
        OverflowPolicy::Abort,
        Some(Duration::from_millis(250)),
    );

    let error = builder
        .pack_and_send(&[hundred_byte_message("m1")])
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        TransportError::Timeout {
            operation: "create batch",
            ..
        }
    ));
}
