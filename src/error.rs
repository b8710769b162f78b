//! Error types surfaced by the mediator.
//!
//! Transient backend failures and authorization rejections are not errors:
//! the first is retried under the transaction boundary and the second is a
//! normal reply. Only caller-visible conditions live here.

use std::time::Duration;

use thiserror::Error;

use crate::queue::message::{CorrelationId, MessageId};

/// The caller's deadline elapsed before a terminal decision was reached.
#[derive(Debug, Clone, Error)]
#[error("exchange {correlation_id} timed out after {deadline:?}")]
pub struct ExchangeTimedOut {
    pub correlation_id: CorrelationId,
    pub deadline: Duration,
}

/// Errors returned to a caller of [`crate::gateway::Gateway::send`].
#[derive(Debug, Error)]
pub enum SendError {
    /// No reply within the caller deadline. The underlying message keeps
    /// being retried in the background.
    #[error("request/reply exchange failed")]
    Timeout(#[source] ExchangeTimedOut),

    /// The mediator is shut down; the request was not accepted or will never
    /// be answered.
    #[error("mediator is shut down")]
    Closed,
}

impl SendError {
    /// True if this is a caller-side deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SendError::Timeout(_))
    }
}

/// Errors from the queue bridge.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue no longer accepts messages.
    #[error("queue is closed")]
    Closed,

    /// Recording the commit failed; the unit of work was rolled back.
    #[error("commit failed for {message_id}: {reason}")]
    CommitFailed { message_id: MessageId, reason: String },
}

impl From<QueueError> for SendError {
    fn from(_: QueueError) -> Self {
        SendError::Closed
    }
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;
