//! Message envelope carried through the queue.
//!
//! # Responsibilities
//! - Identify a logical request (correlation ID) and a queue entry (message ID)
//! - Carry the raw payload and string headers forwarded to the backend
//! - Track the redelivery counter across rollbacks

use std::collections::HashMap;
use std::time::Instant;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header map forwarded with a message. Ordering is irrelevant.
pub type Headers = HashMap<String, String>;

/// Opaque token linking a reply back to the caller that is waiting for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a fresh correlation ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a queue entry. Stable across redeliveries of the same message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// A request travelling from the gateway to the backend.
///
/// Only the queue bridge mutates a message, and only to bump the redelivery
/// counter when a unit of work rolls back.
#[derive(Debug, Clone)]
pub struct Message {
    /// Queue entry identity.
    pub id: MessageId,
    /// Caller correlation.
    pub correlation_id: CorrelationId,
    /// Raw request payload.
    pub body: Bytes,
    /// Headers forwarded to the backend (e.g. `user`).
    pub headers: Headers,
    /// Redelivery bound captured when the message was created. `None` retries forever.
    pub max_redeliveries: Option<u32>,
    /// When the message first entered the queue.
    pub enqueued_at: Instant,
    redelivery_count: u32,
}

impl Message {
    /// Create a brand-new message with a zero redelivery counter.
    pub fn new(
        correlation_id: CorrelationId,
        body: Bytes,
        headers: Headers,
        max_redeliveries: Option<u32>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            correlation_id,
            body,
            headers,
            max_redeliveries,
            enqueued_at: Instant::now(),
            redelivery_count: 0,
        }
    }

    /// Number of times this message has been redelivered after a rollback.
    pub fn redelivery_count(&self) -> u32 {
        self.redelivery_count
    }

    /// True if this delivery is a redelivery.
    pub fn is_redelivery(&self) -> bool {
        self.redelivery_count > 0
    }

    /// Look up a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub(crate) fn mark_redelivered(&mut self) {
        self.redelivery_count = self.redelivery_count.saturating_add(1);
    }
}
