//! Capacity-aware batch packing.
//!
//! Packs an ordered sequence of outbound messages into broker batches,
//! reacting to the broker's capacity-rejection signal. Input order is
//! preserved across and within batches, and batch sends are strictly
//! sequential.

use crate::error::TransportError;
use crate::link::{bounded, SenderLink};
use crate::mapper;
use crate::message::OutboundMessage;
use crate::wire::WireMessage;
use std::time::Duration;
use tracing::debug;

/// What to do when the broker rejects an add because the batch is full.
///
/// The policy is an explicit knob rather than a silent default: `Abort`
/// matches the historical behavior (nothing from the call is sent),
/// `Rollover` packs into as many batches as needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// A rejected add fails the whole call; no batch of this call is sent.
    #[default]
    Abort,
    /// A rejected add closes out the current batch and retries against a
    /// fresh one. Batches already sent within the call are not rolled back.
    Rollover,
}

/// Packs messages into capacity-bounded batches and dispatches them in order
pub struct BatchBuilder<'a> {
    link: &'a dyn SenderLink,
    policy: OverflowPolicy,
    deadline: Option<Duration>,
}

impl<'a> BatchBuilder<'a> {
    pub fn new(
        link: &'a dyn SenderLink,
        policy: OverflowPolicy,
        deadline: Option<Duration>,
    ) -> Self {
        Self {
            link,
            policy,
            deadline,
        }
    }

    /// Map, pack, and send all messages. Returns the number of batches sent.
    ///
    /// All messages are mapped to wire form before the first network call, so
    /// nothing is sent unless the whole input mapped.
    pub async fn pack_and_send(
        &self,
        messages: &[OutboundMessage],
    ) -> Result<usize, TransportError> {
        if messages.is_empty() {
            return Ok(0);
        }

        let wire: Vec<WireMessage> = messages.iter().map(mapper::to_wire).collect();

        let batches = match self.policy {
            OverflowPolicy::Abort => self.send_single_batch(&wire).await?,
            OverflowPolicy::Rollover => self.send_rolling(&wire).await?,
        };

        debug!(
            count = messages.len(),
            batches,
            policy = ?self.policy,
            "batch dispatch complete"
        );
        Ok(batches)
    }

    /// Abort policy: one batch, sent only after every message was accepted.
    async fn send_single_batch(&self, wire: &[WireMessage]) -> Result<usize, TransportError> {
        let mut batch = bounded(self.deadline, "create batch", self.link.create_batch()).await?;

        for (index, message) in wire.iter().enumerate() {
            if !batch.try_add(message) {
                // A message no empty batch can hold is oversized, not a
                // capacity overflow.
                if batch.is_empty() {
                    return Err(TransportError::MessageTooLarge { index });
                }
                return Err(TransportError::BatchCapacityExceeded {
                    index,
                    batched: batch.len(),
                });
            }
        }

        if batch.is_empty() {
            return Ok(0);
        }
        bounded(self.deadline, "send batch", self.link.send_batch(batch)).await?;
        Ok(1)
    }

    /// Rollover policy: a full batch is sent and the rejected message retried
    /// against a fresh one.
    async fn send_rolling(&self, wire: &[WireMessage]) -> Result<usize, TransportError> {
        let mut batch = bounded(self.deadline, "create batch", self.link.create_batch()).await?;
        let mut batches_sent = 0usize;

        for (index, message) in wire.iter().enumerate() {
            if batch.try_add(message) {
                continue;
            }

            if batch.is_empty() {
                return Err(TransportError::MessageTooLarge { index });
            }

            bounded(self.deadline, "send batch", self.link.send_batch(batch)).await?;
            batches_sent += 1;

            batch = bounded(self.deadline, "create batch", self.link.create_batch()).await?;
            if !batch.try_add(message) {
                return Err(TransportError::MessageTooLarge { index });
            }
        }

        if !batch.is_empty() {
            bounded(self.deadline, "send batch", self.link.send_batch(batch)).await?;
            batches_sent += 1;
        }
        Ok(batches_sent)
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
