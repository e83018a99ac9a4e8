//! Tests for the in-memory broker backend.

use super::*;
use bytes::Bytes;

fn entity(name: &str) -> EntityName {
    name.parse().unwrap()
}

fn text_message(body: &str) -> WireMessage {
    WireMessage {
        body: Bytes::from(body.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_send_receive_round_trip_stamps_metadata() {
    let broker = InMemoryBroker::default();
    let sender = broker.create_sender(&entity("orders")).await.unwrap();
    let receiver = broker
        .create_receiver(&ReceiveSource::Queue(entity("orders")))
        .await
        .unwrap();

    sender.send(&text_message("hello")).await.unwrap();

    let received = receiver.receive(10).await.unwrap();
    assert_eq!(received.len(), 1);
    let message = &received[0];
    assert_eq!(message.body, Bytes::from_static(b"hello"));
    assert!(!message.message_id.is_empty(), "broker assigns an id");
    assert!(!message.lock_token.is_empty());
    assert_eq!(message.delivery_count, 1);
    assert_eq!(message.sequence_number, Some(1));
    assert!(message.enqueued_time.is_some());
    assert!(message.locked_until.is_some());
}

#[tokio::test]
async fn test_explicit_message_id_is_kept() {
    let broker = InMemoryBroker::default();
    let sender = broker.create_sender(&entity("orders")).await.unwrap();
    let receiver = broker
        .create_receiver(&ReceiveSource::Queue(entity("orders")))
        .await
        .unwrap();

    let message = WireMessage {
        message_id: Some("explicit-id".to_string()),
        ..text_message("x")
    };
    sender.send(&message).await.unwrap();

    let received = receiver.receive(1).await.unwrap();
    assert_eq!(received[0].message_id, "explicit-id");
}

#[tokio::test]
async fn test_fifo_order_and_bounded_receive() {
    let broker = InMemoryBroker::default();
    let sender = broker.create_sender(&entity("orders")).await.unwrap();
    let receiver = broker
        .create_receiver(&ReceiveSource::Queue(entity("orders")))
        .await
        .unwrap();

    for body in ["m1", "m2", "m3"] {
        sender.send(&text_message(body)).await.unwrap();
    }

    let first = receiver.receive(2).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].body, Bytes::from_static(b"m1"));
    assert_eq!(first[1].body, Bytes::from_static(b"m2"));

    let rest = receiver.receive(2).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].body, Bytes::from_static(b"m3"));
}

#[tokio::test]
async fn test_empty_queue_returns_no_messages() {
    let broker = InMemoryBroker::default();
    let receiver = broker
        .create_receiver(&ReceiveSource::Queue(entity("empty")))
        .await
        .unwrap();

    let received = receiver.receive(5).await.unwrap();
    assert!(received.is_empty());
}

#[tokio::test]
async fn test_complete_removes_from_in_flight_once() {
    let broker = InMemoryBroker::default();
    let sender = broker.create_sender(&entity("orders")).await.unwrap();
    let receiver = broker
        .create_receiver(&ReceiveSource::Queue(entity("orders")))
        .await
        .unwrap();

    sender.send(&text_message("once")).await.unwrap();
    let received = receiver.receive(1).await.unwrap();

    receiver.complete(&received[0]).await.unwrap();
    let error = receiver.complete(&received[0]).await.unwrap_err();
    assert!(matches!(error, TransportError::Complete { .. }));
}

#[tokio::test]
async fn test_topic_fans_out_to_every_subscription() {
    let broker = InMemoryBroker::default();
    let audit = broker
        .create_receiver(&ReceiveSource::Subscription {
            topic: entity("events"),
            subscription: entity("audit"),
        })
        .await
        .unwrap();
    let billing = broker
        .create_receiver(&ReceiveSource::Subscription {
            topic: entity("events"),
            subscription: entity("billing"),
        })
        .await
        .unwrap();

    let sender = broker.create_sender(&entity("events")).await.unwrap();
    sender.send(&text_message("fan-out")).await.unwrap();

    let got_audit = audit.receive(1).await.unwrap();
    let got_billing = billing.receive(1).await.unwrap();
    assert_eq!(got_audit.len(), 1);
    assert_eq!(got_billing.len(), 1);
    assert_eq!(got_audit[0].message_id, got_billing[0].message_id);
}

#[tokio::test]
async fn test_batch_capacity_rejects_and_leaves_batch_unchanged() {
    let broker = InMemoryBroker::new(InMemoryConfig {
        batch_capacity: 200,
    });
    let sender = broker.create_sender(&entity("orders")).await.unwrap();

    let mut batch = sender.create_batch().await.unwrap();
    assert!(batch.try_add(&text_message(&"a".repeat(100))));
    assert_eq!(batch.len(), 1);
    assert!(!batch.try_add(&text_message(&"b".repeat(100))));
    assert_eq!(batch.len(), 1, "rejected add leaves the batch unchanged");
}

#[tokio::test]
async fn test_batch_send_delivers_in_order() {
    let broker = InMemoryBroker::default();
    let sender = broker.create_sender(&entity("orders")).await.unwrap();
    let receiver = broker
        .create_receiver(&ReceiveSource::Queue(entity("orders")))
        .await
        .unwrap();

    let mut batch = sender.create_batch().await.unwrap();
    assert!(batch.try_add(&text_message("b1")));
    assert!(batch.try_add(&text_message("b2")));
    sender.send_batch(batch).await.unwrap();

    let received = receiver.receive(10).await.unwrap();
    assert_eq!(received.len(), 2);
    assert_eq!(received[0].body, Bytes::from_static(b"b1"));
    assert_eq!(received[1].body, Bytes::from_static(b"b2"));
}

#[tokio::test]
async fn test_closed_connection_rejects_new_links() {
    let broker = InMemoryBroker::default();
    broker.close().await.unwrap();

    let sender = broker.create_sender(&entity("orders")).await;
    assert!(matches!(sender, Err(TransportError::LinkCreation { .. })));
    let receiver = broker
        .create_receiver(&ReceiveSource::Queue(entity("orders")))
        .await;
    assert!(matches!(receiver, Err(TransportError::LinkCreation { .. })));
}

#[tokio::test]
async fn test_polling_receiver_yields_to_concurrent_sender() {
    let broker = InMemoryBroker::default();
    let sender = broker.create_sender(&entity("orders")).await.unwrap();
    let receiver = broker
        .create_receiver(&ReceiveSource::Queue(entity("orders")))
        .await
        .unwrap();

    // On the current-thread runtime this loop only makes progress if an
    // empty receive yields back to the scheduler.
    let poll = tokio::spawn(async move {
        loop {
            let mut got = receiver.receive(1).await.unwrap();
            if let Some(message) = got.pop() {
                return message;
            }
        }
    });

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    sender.send(&text_message("late arrival")).await.unwrap();

    let message = tokio::time::timeout(std::time::Duration::from_secs(5), poll)
        .await
        .expect("polling receiver starved the sender")
        .unwrap();
    assert_eq!(message.body, Bytes::from("late arrival"));
}
