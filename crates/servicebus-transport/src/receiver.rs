//! Inbound message orchestration.
//!
//! Every message goes through receive -> complete -> map before the caller
//! sees it: the record handed out has already been acknowledged and holds no
//! handle back to the broker. A received-but-uncompleted message is never
//! observable.

use crate::error::TransportError;
use crate::link::{bounded, ReceiveSource, ReceiverLink};
use crate::mapper;
use crate::message::ReceivedMessage;
use std::time::Duration;
use tracing::{debug, warn};

/// Handle owning a single inbound link to a queue or subscription.
///
/// One logical caller at a time; operations on the same handle must not be
/// interleaved.
pub struct Receiver {
    source: ReceiveSource,
    link: Box<dyn ReceiverLink>,
    deadline: Option<Duration>,
}

impl std::fmt::Debug for Receiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver")
            .field("source", &self.source)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl Receiver {
    pub(crate) fn new(
        source: ReceiveSource,
        link: Box<dyn ReceiverLink>,
        deadline: Option<Duration>,
    ) -> Self {
        Self {
            source,
            link,
            deadline,
        }
    }

    /// Queue or subscription this receiver is bound to
    pub fn source(&self) -> &ReceiveSource {
        &self.source
    }

    /// Request exactly one message.
    ///
    /// Returns `Ok(None)` when the broker reports no message currently
    /// available — a single request, no retry. A returned message is
    /// completed before it is mapped; a completion failure surfaces as
    /// [`TransportError::Complete`], distinct from a receive failure.
    pub async fn get_message(&self) -> Result<Option<ReceivedMessage>, TransportError> {
        let mut received = bounded(self.deadline, "receive", self.link.receive(1)).await?;

        let Some(wire) = received.pop() else {
            return Ok(None);
        };

        bounded(self.deadline, "complete", self.link.complete(&wire)).await?;
        Ok(Some(mapper::from_wire(&wire)))
    }

    /// Accumulate until exactly `count` messages have been collected.
    ///
    /// Issues repeated receive requests for the remaining shortfall and
    /// appends results in arrival order. Each chunk a single broker call
    /// returns is fully mapped and then fully completed before the next
    /// receive is issued. Without a configured per-call deadline this loop
    /// can block for as long as the broker withholds messages.
    ///
    /// A completion failure mid-chunk surfaces an error; completions that
    /// already succeeded are not undone — those messages will not be
    /// redelivered.
    pub async fn get_messages(
        &self,
        count: usize,
    ) -> Result<Vec<ReceivedMessage>, TransportError> {
        let mut collected = Vec::with_capacity(count.min(1024));

        while collected.len() < count {
            // Shortfalls beyond the wire limit are requested in u32::MAX
            // slices.
            let shortfall = u32::try_from(count - collected.len()).unwrap_or(u32::MAX);
            let chunk = bounded(self.deadline, "receive", self.link.receive(shortfall)).await?;

            for wire in &chunk {
                collected.push(mapper::from_wire(wire));
            }

            for wire in &chunk {
                if let Err(error) =
                    bounded(self.deadline, "complete", self.link.complete(wire)).await
                {
                    warn!(
                        source = %self.source,
                        message_id = %wire.message_id,
                        "completion failed mid-chunk; earlier completions stand"
                    );
                    return Err(error);
                }
            }

            debug!(
                source = %self.source,
                chunk = chunk.len(),
                collected = collected.len(),
                requested = count,
                "accumulation progress"
            );
        }

        Ok(collected)
    }

    /// Release the inbound link. Consumes the handle, so a second close is
    /// unrepresentable.
    pub async fn close(self) -> Result<(), TransportError> {
        bounded(self.deadline, "close receiver", self.link.close()).await
    }
}

#[cfg(test)]
#[path = "receiver_tests.rs"]
mod tests;
