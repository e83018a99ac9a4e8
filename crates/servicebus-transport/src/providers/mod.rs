//! Broker backend implementations.
//!
//! This module contains concrete implementations of the broker primitive
//! traits from [`crate::link`] for different backends.

pub mod memory;

pub use memory::{InMemoryBroker, InMemoryConfig, InMemoryConnector};
