//! # Service Bus Transport
//!
//! Broker-agnostic transport layer for sending and receiving messages through
//! a queue/topic broker without exposing the broker SDK's native types.
//!
//! This library provides:
//! - Bidirectional mapping between generic message records and the broker
//!   wire shape, with presence-preserving optional fields
//! - Capacity-aware batch packing with an explicit overflow policy
//! - A receive-and-complete accumulation loop over an at-least-once queue
//! - A client factory scoping senders and receivers to named queues, topics,
//!   and subscriptions
//! - An in-memory broker backend for tests and development
//!
//! ## Module Organization
//!
//! - [client] - Configuration, connection strings, and the client factory
//! - [error] - Error types for all transport operations
//! - [message] - Generic message records and entity names
//! - [wire] - Broker wire message shapes
//! - [mapper] - Pure mapping between the two representations
//! - [link] - Broker primitive traits implemented by backends
//! - [batch] - Capacity-aware batch packing
//! - [sender] / [receiver] - Single-link operation handles
//! - [providers] - Broker backend implementations

// Module declarations
pub mod batch;
pub mod client;
pub mod error;
pub mod link;
pub mod mapper;
pub mod message;
pub mod providers;
pub mod receiver;
pub mod sender;
pub mod wire;

// Re-export commonly used types at crate root for convenience
pub use batch::{BatchBuilder, OverflowPolicy};
pub use client::{
    BrokerConnector, ClientConfig, ConnectionStringProperties, ServiceBusClient, TlsOptions,
};
pub use error::{ConfigurationError, TransportError, ValidationError};
pub use link::{BrokerConnection, ReceiveSource, ReceiverLink, SenderLink, WireBatch};
pub use mapper::{from_wire, to_wire};
pub use message::{EntityName, MessageState, OutboundMessage, ReceivedMessage};
pub use providers::{InMemoryBroker, InMemoryConfig, InMemoryConnector};
pub use receiver::Receiver;
pub use sender::Sender;
pub use wire::{PropertyValue, WireMessage, WireMessageState, WireReceivedMessage};
