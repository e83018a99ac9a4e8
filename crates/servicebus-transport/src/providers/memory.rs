//! In-memory broker implementation for testing and development.
//!
//! A fully functional backend behind the [`crate::link`] seam:
//! - FIFO queues with lock tokens and an in-flight set
//! - topic to subscription fan-out on send
//! - broker-side message-id and sequence-number stamping
//! - size-estimated batches with a configurable byte capacity
//!
//! An entity counts as a topic once at least one subscription receiver has
//! been created for it; sends to it then fan out to every subscription.
//! TLS options are accepted and ignored.

use crate::client::{BrokerConnector, ConnectionStringProperties, TlsOptions};
use crate::error::TransportError;
use crate::link::{BrokerConnection, ReceiveSource, ReceiverLink, SenderLink, WireBatch};
use crate::message::EntityName;
use crate::wire::{WireMessage, WireReceivedMessage, WireMessageState};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::any::Any;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

/// How long a received message stays locked before it would be redeliverable
const LOCK_DURATION_SECONDS: i64 = 60;

/// Pause before re-checking an empty queue, so a polling caller yields
/// instead of spinning on the storage lock
const EMPTY_POLL_DELAY: std::time::Duration = std::time::Duration::from_millis(10);

/// In-memory broker configuration
#[derive(Debug, Clone)]
pub struct InMemoryConfig {
    /// Byte capacity of one batch, standing in for the broker-determined limit
    pub batch_capacity: usize,
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            batch_capacity: 256 * 1024,
        }
    }
}

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// Thread-safe storage for all entities
struct QueueStorage {
    entities: HashMap<String, EntityQueue>,
    /// Topic name -> subscription entity keys
    topics: HashMap<String, HashSet<String>>,
    next_sequence: i64,
}

impl QueueStorage {
    fn new() -> Self {
        Self {
            entities: HashMap::new(),
            topics: HashMap::new(),
            next_sequence: 0,
        }
    }

    fn get_or_create_entity(&mut self, key: &str) -> &mut EntityQueue {
        self.entities
            .entry(key.to_string())
            .or_insert_with(EntityQueue::new)
    }

    /// Destination keys a send to `entity` resolves to
    fn destinations(&self, entity: &str) -> Vec<String> {
        match self.topics.get(entity) {
            Some(subscriptions) => subscriptions.iter().cloned().collect(),
            None => vec![entity.to_string()],
        }
    }

    /// Stamp broker metadata onto an outbound wire message
    fn stamp(&mut self, message: &WireMessage) -> WireReceivedMessage {
        let now = Utc::now();
        self.next_sequence += 1;
        let sequence = self.next_sequence;

        WireReceivedMessage {
            application_properties: message.application_properties.clone(),
            body: message.body.clone(),
            content_type: message.content_type.clone(),
            correlation_id: message.correlation_id.clone(),
            delivery_count: 0,
            enqueued_sequence_number: Some(sequence),
            enqueued_time: Some(now),
            expires_at: message.time_to_live.map(|ttl| now + ttl),
            message_id: message
                .message_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            partition_key: message.partition_key.clone(),
            reply_to: message.reply_to.clone(),
            reply_to_session_id: message.reply_to_session_id.clone(),
            sequence_number: Some(sequence),
            session_id: message.session_id.clone(),
            state: WireMessageState::Active,
            subject: message.subject.clone(),
            time_to_live: message.time_to_live,
            to: message.to.clone(),
            ..Default::default()
        }
    }

    fn deliver(&mut self, entity: &str, message: &WireMessage) {
        let stamped = self.stamp(message);
        for destination in self.destinations(entity) {
            self.get_or_create_entity(&destination)
                .messages
                .push_back(stamped.clone());
        }
    }
}

/// State for a single queue or subscription
struct EntityQueue {
    /// Available messages in FIFO order
    messages: VecDeque<WireReceivedMessage>,
    /// Received but not yet completed, keyed by lock token
    in_flight: HashMap<String, WireReceivedMessage>,
}

impl EntityQueue {
    fn new() -> Self {
        Self {
            messages: VecDeque::new(),
            in_flight: HashMap::new(),
        }
    }
}

/// Storage key for a receive source
fn source_key(source: &ReceiveSource) -> String {
    source.to_string()
}

// ============================================================================
// InMemoryBroker
// ============================================================================

/// In-memory broker connection
pub struct InMemoryBroker {
    storage: Arc<RwLock<QueueStorage>>,
    config: InMemoryConfig,
    closed: AtomicBool,
}

impl InMemoryBroker {
    /// Create new in-memory broker with configuration
    pub fn new(config: InMemoryConfig) -> Self {
        Self {
            storage: Arc::new(RwLock::new(QueueStorage::new())),
            config,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self, entity: &str) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::LinkCreation {
                entity: entity.to_string(),
                message: "connection is closed".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new(InMemoryConfig::default())
    }
}

#[async_trait]
impl BrokerConnection for InMemoryBroker {
    async fn create_sender(
        &self,
        entity: &EntityName,
    ) -> Result<Box<dyn SenderLink>, TransportError> {
        self.ensure_open(entity.as_str())?;
        Ok(Box::new(InMemorySenderLink {
            storage: Arc::clone(&self.storage),
            entity: entity.clone(),
            batch_capacity: self.config.batch_capacity,
        }))
    }

    async fn create_receiver(
        &self,
        source: &ReceiveSource,
    ) -> Result<Box<dyn ReceiverLink>, TransportError> {
        let key = source_key(source);
        self.ensure_open(&key)?;

        let mut storage = self.storage.write().await;
        storage.get_or_create_entity(&key);
        if let ReceiveSource::Subscription { topic, .. } = source {
            storage
                .topics
                .entry(topic.as_str().to_string())
                .or_default()
                .insert(key.clone());
        }
        drop(storage);

        Ok(Box::new(InMemoryReceiverLink {
            storage: Arc::clone(&self.storage),
            key,
        }))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        debug!("in-memory broker connection closed");
        Ok(())
    }
}

// ============================================================================
// Sender Link
// ============================================================================

struct InMemorySenderLink {
    storage: Arc<RwLock<QueueStorage>>,
    entity: EntityName,
    batch_capacity: usize,
}

#[async_trait]
impl SenderLink for InMemorySenderLink {
    async fn send(&self, message: &WireMessage) -> Result<(), TransportError> {
        let mut storage = self.storage.write().await;
        storage.deliver(self.entity.as_str(), message);
        Ok(())
    }

    async fn create_batch(&self) -> Result<Box<dyn WireBatch>, TransportError> {
        Ok(Box::new(InMemoryBatch {
            capacity: self.batch_capacity,
            used: 0,
            messages: Vec::new(),
        }))
    }

    async fn send_batch(&self, batch: Box<dyn WireBatch>) -> Result<(), TransportError> {
        let batch = batch
            .into_any()
            .downcast::<InMemoryBatch>()
            .map_err(|_| TransportError::BatchSend {
                message: "batch was created by a different backend".to_string(),
            })?;

        // Single lock hold: the batch lands in full or not at all
        let mut storage = self.storage.write().await;
        for message in &batch.messages {
            storage.deliver(self.entity.as_str(), message);
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Byte-capacity batch using the wire size estimate
struct InMemoryBatch {
    capacity: usize,
    used: usize,
    messages: Vec<WireMessage>,
}

impl WireBatch for InMemoryBatch {
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

// ============================================================================
// Receiver Link
// ============================================================================

struct InMemoryReceiverLink {
    storage: Arc<RwLock<QueueStorage>>,
    key: String,
}

impl InMemoryReceiverLink {
    async fn pop_available(&self, max_count: u32) -> Vec<WireReceivedMessage> {
        let mut storage = self.storage.write().await;
        let queue = storage.get_or_create_entity(&self.key);

        let mut received = Vec::new();
        while received.len() < max_count as usize {
            let Some(mut message) = queue.messages.pop_front() else {
                break;
            };
            message.delivery_count += 1;
            message.lock_token = Uuid::new_v4().to_string();
            message.locked_until =
                Some(Utc::now() + Duration::seconds(LOCK_DURATION_SECONDS));
            queue
                .in_flight
                .insert(message.lock_token.clone(), message.clone());
            received.push(message);
        }
        received
    }
}

#[async_trait]
impl ReceiverLink for InMemoryReceiverLink {
    async fn receive(&self, max_count: u32) -> Result<Vec<WireReceivedMessage>, TransportError> {
        if max_count == 0 {
            return Ok(Vec::new());
        }

        let received = self.pop_available(max_count).await;
        if !received.is_empty() {
            return Ok(received);
        }

        // The lock is released across the pause, giving senders a window
        // before one more look.
        tokio::time::sleep(EMPTY_POLL_DELAY).await;
        Ok(self.pop_available(max_count).await)
    }

    async fn complete(&self, message: &WireReceivedMessage) -> Result<(), TransportError> {
        let mut storage = self.storage.write().await;
        let queue = storage.get_or_create_entity(&self.key);
        if queue.in_flight.remove(&message.lock_token).is_none() {
            return Err(TransportError::Complete {
                message: format!(
                    "no in-flight message for lock token '{}'",
                    message.lock_token
                ),
            });
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Opens in-memory broker connections
#[derive(Debug, Clone, Default)]
pub struct InMemoryConnector {
    config: InMemoryConfig,
}

impl InMemoryConnector {
    pub fn new(config: InMemoryConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrokerConnector for InMemoryConnector {
    async fn connect(
        &self,
        properties: &ConnectionStringProperties,
        tls: &TlsOptions,
    ) -> Result<Arc<dyn BrokerConnection>, TransportError> {
        if tls.insecure_skip_verify {
            debug!("insecure_skip_verify has no effect on the in-memory backend");
        }
        debug!(namespace = %properties.namespace, "in-memory broker connected");
        Ok(Arc::new(InMemoryBroker::new(self.config.clone())))
    }
}
