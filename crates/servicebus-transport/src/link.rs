//! Broker primitive seam.
//!
//! These traits are the boundary between the transport logic and whatever
//! client library actually speaks to the broker. Everything above this seam is
//! broker-agnostic; backends live in [`crate::providers`].
//!
//! A link is a logical channel (send or receive) bound to one queue, topic, or
//! subscription, owned exclusively by one `Sender` or `Receiver`. Links are not
//! designed for concurrent use; callers serialize operations per handle.

use crate::error::TransportError;
use crate::message::EntityName;
use crate::wire::{WireMessage, WireReceivedMessage};
use async_trait::async_trait;
use std::any::Any;
use std::future::Future;
use std::time::Duration;

/// Source a receiver link is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveSource {
    Queue(EntityName),
    Subscription {
        topic: EntityName,
        subscription: EntityName,
    },
}

impl std::fmt::Display for ReceiveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queue(queue) => write!(f, "{}", queue),
            Self::Subscription {
                topic,
                subscription,
            } => write!(f, "{}/subscriptions/{}", topic, subscription),
        }
    }
}

/// A broker connection, shared as a factory by all links derived from it
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    /// Open an outbound link to a queue or topic
    async fn create_sender(&self, entity: &EntityName)
        -> Result<Box<dyn SenderLink>, TransportError>;

    /// Open an inbound link to a queue or subscription
    async fn create_receiver(
        &self,
        source: &ReceiveSource,
    ) -> Result<Box<dyn ReceiverLink>, TransportError>;

    /// Close the connection; all derived links become invalid
    async fn close(&self) -> Result<(), TransportError>;
}

/// Outbound broker link
#[async_trait]
pub trait SenderLink: Send + Sync {
    /// Send one wire message and wait for broker acknowledgment
    async fn send(&self, message: &WireMessage) -> Result<(), TransportError>;

    /// Open a new empty batch with broker-determined byte capacity
    async fn create_batch(&self) -> Result<Box<dyn WireBatch>, TransportError>;

    /// Send a batch in full; the batch is consumed whether or not the send
    /// succeeds
    async fn send_batch(&self, batch: Box<dyn WireBatch>) -> Result<(), TransportError>;

    /// Release the link
    async fn close(&self) -> Result<(), TransportError>;
}

/// Opaque broker-owned batch accumulator with a fixed byte capacity
pub trait WireBatch: Send {
    /// Attempt to add a message. Returns `false` when capacity would be
    /// exceeded; a rejected add leaves the batch unchanged.
    fn try_add(&mut self, message: &WireMessage) -> bool;

    /// Number of messages accepted so far
    fn len(&self) -> usize;

    /// True when no message has been accepted yet
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Downcast support for the backend that created the batch
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

/// Inbound broker link
#[async_trait]
pub trait ReceiverLink: Send + Sync {
    /// Receive between 0 and `max_count` messages. Suspends until at least
    /// one message arrives or the broker reports none currently available.
    async fn receive(&self, max_count: u32) -> Result<Vec<WireReceivedMessage>, TransportError>;

    /// Acknowledge a received message so it leaves the redelivery set
    async fn complete(&self, message: &WireReceivedMessage) -> Result<(), TransportError>;

    /// Release the link
    async fn close(&self) -> Result<(), TransportError>;
}

/// Apply the configured per-call deadline to a single broker call.
///
/// The deadline bounds one broker round trip, never a whole logical
/// operation: a multi-call accumulation loop is bounded by deadline x calls.
pub(crate) async fn bounded<T, F>(
    deadline: Option<Duration>,
    operation: &'static str,
    call: F,
) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match deadline {
        None => call.await,
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout { operation, limit }),
        },
    }
}
