//! A single delivery attempt: the queue side of a unit of work.
//!
//! A delivery is settled exactly once, by [`Delivery::commit`] or
//! [`Delivery::rollback`]. Dropping an unsettled delivery rolls it back.

use std::sync::Arc;
use std::time::Instant;

use crate::error::QueueResult;
use crate::queue::bridge::QueueBridge;
use crate::queue::message::Message;

#[derive(Debug)]
pub struct Delivery {
    message: Option<Message>,
    bridge: Arc<QueueBridge>,
    received_at: Instant,
}

impl Delivery {
    pub(crate) fn new(message: Message, bridge: Arc<QueueBridge>) -> Self {
        Self {
            message: Some(message),
            bridge,
            received_at: Instant::now(),
        }
    }

    /// The delivered message.
    pub fn message(&self) -> &Message {
        match &self.message {
            Some(message) => message,
            // commit/rollback consume the delivery, so it is never observed settled
            None => unreachable!("delivery already settled"),
        }
    }

    pub fn received_at(&self) -> Instant {
        self.received_at
    }

    /// Mark the message consumed. On failure the delivery is rolled back
    /// before the error is returned.
    pub fn commit(mut self) -> QueueResult<()> {
        match self.message.take() {
            Some(message) => self.bridge.commit(message),
            None => Ok(()),
        }
    }

    /// Return the message to the queue for redelivery.
    pub fn rollback(mut self) {
        if let Some(message) = self.message.take() {
            self.bridge.redeliver(message);
        }
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        if let Some(message) = self.message.take() {
            tracing::warn!(
                correlation_id = %message.correlation_id,
                message_id = %message.id,
                "Delivery dropped without commit or rollback, rolling back"
            );
            self.bridge.redeliver(message);
        }
    }
}
