//! Outbound message orchestration.

use crate::batch::{BatchBuilder, OverflowPolicy};
use crate::error::TransportError;
use crate::link::{bounded, SenderLink};
use crate::mapper;
use crate::message::{EntityName, OutboundMessage};
use std::time::Duration;
use tracing::debug;

/// Handle owning a single outbound link to a queue or topic.
///
/// One logical caller at a time; operations on the same handle must not be
/// interleaved. The handle performs no automatic retry — every broker failure
/// surfaces immediately to the caller.
pub struct Sender {
    entity: EntityName,
    link: Box<dyn SenderLink>,
    deadline: Option<Duration>,
    overflow_policy: OverflowPolicy,
}

impl std::fmt::Debug for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender")
            .field("entity", &self.entity)
            .field("deadline", &self.deadline)
            .field("overflow_policy", &self.overflow_policy)
            .finish_non_exhaustive()
    }
}

impl Sender {
    pub(crate) fn new(
        entity: EntityName,
        link: Box<dyn SenderLink>,
        deadline: Option<Duration>,
    ) -> Self {
        Self {
            entity,
            link,
            deadline,
            overflow_policy: OverflowPolicy::default(),
        }
    }

    /// Choose what happens when a batch overflows; `Abort` is the default
    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Queue or topic this sender is bound to
    pub fn entity(&self) -> &EntityName {
        &self.entity
    }

    /// Send raw text as a body-only message
    pub async fn send(&self, body: &str) -> Result<(), TransportError> {
        self.send_message(&OutboundMessage::new().with_body_text(body))
            .await
    }

    /// Send a single fully-specified message and wait for acknowledgment
    pub async fn send_message(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let wire = mapper::to_wire(message);
        bounded(self.deadline, "send", self.link.send(&wire)).await?;
        debug!(entity = %self.entity, "message sent");
        Ok(())
    }

    /// Send a sequence of text bodies as one or more batches
    pub async fn send_batch(&self, bodies: &[String]) -> Result<(), TransportError> {
        let messages: Vec<OutboundMessage> = bodies
            .iter()
            .map(|body| OutboundMessage::new().with_body_text(body.clone()))
            .collect();
        self.send_message_batch(&messages).await
    }

    /// Send a sequence of fully-specified messages as one or more batches
    pub async fn send_message_batch(
        &self,
        messages: &[OutboundMessage],
    ) -> Result<(), TransportError> {
        let builder = BatchBuilder::new(self.link.as_ref(), self.overflow_policy, self.deadline);
        let batches = builder.pack_and_send(messages).await?;
        debug!(
            entity = %self.entity,
            count = messages.len(),
            batches,
            "batch send complete"
        );
        Ok(())
    }

    /// Release the outbound link. Consumes the handle, so a second close is
    /// unrepresentable.
    pub async fn close(self) -> Result<(), TransportError> {
        bounded(self.deadline, "close sender", self.link.close()).await
    }
}

#[cfg(test)]
#[path = "sender_tests.rs"]
mod tests;
