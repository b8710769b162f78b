//! Commit log: the record that a message has been consumed.
//!
//! A message whose ID is in the log is never handed to a worker again, so a
//! duplicate left behind by an at-least-once store is skipped rather than
//! answered twice.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use crate::error::{QueueError, QueueResult};
use crate::queue::message::{Message, MessageId};

/// Where commits are recorded.
pub trait CommitLog: Send + Sync {
    /// Record that `message` is consumed. An error aborts the commit and the
    /// unit of work rolls back.
    fn record_commit(&self, message: &Message) -> QueueResult<()>;

    /// True if `id` has already been committed.
    fn is_committed(&self, id: &MessageId) -> bool;
}

/// Default number of committed IDs remembered by [`InMemoryCommitLog`].
pub const DEFAULT_RETENTION: usize = 100_000;

/// Bounded in-memory commit log. The oldest IDs are forgotten first.
#[derive(Debug)]
pub struct InMemoryCommitLog {
    retention: usize,
    inner: Mutex<Committed>,
}

#[derive(Debug, Default)]
struct Committed {
    ids: HashSet<MessageId>,
    order: VecDeque<MessageId>,
}

impl InMemoryCommitLog {
    pub fn new(retention: usize) -> Self {
        Self {
            retention: retention.max(1),
            inner: Mutex::new(Committed::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|c| c.ids.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryCommitLog {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl CommitLog for InMemoryCommitLog {
    fn record_commit(&self, message: &Message) -> QueueResult<()> {
        let mut committed = self.inner.lock().map_err(|_| QueueError::CommitFailed {
            message_id: message.id,
            reason: "commit log lock poisoned".to_string(),
        })?;

        if committed.ids.insert(message.id) {
            committed.order.push_back(message.id);
        }
        while committed.order.len() > self.retention {
            if let Some(oldest) = committed.order.pop_front() {
                committed.ids.remove(&oldest);
            }
        }
        Ok(())
    }

    fn is_committed(&self, id: &MessageId) -> bool {
        self.inner
            .lock()
            .map(|c| c.ids.contains(id))
            .unwrap_or(false)
    }
}
