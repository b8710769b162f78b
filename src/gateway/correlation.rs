//! Correlation table: write-once reply slots keyed by correlation ID.
//!
//! # Invariants
//! - A slot is fulfilled at most once. Fulfilling removes the slot before
//!   sending, so a second fulfillment finds nothing and is discarded.
//! - A caller that stops waiting (deadline, drop) removes its slot; a reply
//!   arriving afterwards is discarded.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::{ExchangeTimedOut, SendError};
use crate::observability::metrics;
use crate::queue::message::CorrelationId;
use crate::reply::Reply;

/// Result of offering a reply to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fulfillment {
    /// The waiting caller received the reply.
    Delivered,
    /// Nobody was waiting any more; the reply was dropped.
    Discarded,
}

/// Pending reply slots.
#[derive(Debug, Default)]
pub struct CorrelationTable {
    slots: DashMap<CorrelationId, oneshot::Sender<Reply>>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a slot for `correlation_id` that expires after `deadline`.
    pub fn register(self: &Arc<Self>, correlation_id: CorrelationId, deadline: Duration) -> PendingCorrelation {
        let (tx, rx) = oneshot::channel();
        self.slots.insert(correlation_id, tx);
        metrics::set_pending_correlations(self.slots.len());

        PendingCorrelation {
            correlation_id,
            deadline,
            expires_at: Instant::now() + deadline,
            rx,
            table: Arc::clone(self),
        }
    }

    /// Hand a reply to its waiting caller.
    pub fn fulfill(&self, reply: Reply) -> Fulfillment {
        let slot = self.slots.remove(&reply.correlation_id);
        metrics::set_pending_correlations(self.slots.len());

        match slot {
            Some((_, tx)) => match tx.send(reply) {
                Ok(()) => Fulfillment::Delivered,
                Err(_) => Fulfillment::Discarded,
            },
            None => Fulfillment::Discarded,
        }
    }

    /// Remove a slot without fulfilling it. Returns true if it was present.
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        let removed = self.slots.remove(correlation_id).is_some();
        if removed {
            metrics::set_pending_correlations(self.slots.len());
        }
        removed
    }

    /// Drop every slot; waiting callers observe [`SendError::Closed`].
    pub fn close_all(&self) {
        self.slots.clear();
        metrics::set_pending_correlations(0);
    }

    pub fn contains(&self, correlation_id: &CorrelationId) -> bool {
        self.slots.contains_key(correlation_id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// A caller's side of one correlation.
///
/// Dropping it unregisters the slot.
#[derive(Debug)]
pub struct PendingCorrelation {
    correlation_id: CorrelationId,
    deadline: Duration,
    expires_at: Instant,
    rx: oneshot::Receiver<Reply>,
    table: Arc<CorrelationTable>,
}

impl PendingCorrelation {
    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Wait for the reply or the deadline, whichever comes first.
    pub async fn wait(mut self) -> Result<Reply, SendError> {
        match tokio::time::timeout_at(self.expires_at, &mut self.rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(SendError::Closed),
            Err(_) => {
                if self.table.cancel(&self.correlation_id) {
                    return Err(self.timed_out());
                }
                // A fulfiller already holds the sender; take what it sends.
                match (&mut self.rx).await {
                    Ok(reply) => Ok(reply),
                    Err(_) => Err(self.timed_out()),
                }
            }
        }
    }

    fn timed_out(&self) -> SendError {
        SendError::Timeout(ExchangeTimedOut {
            correlation_id: self.correlation_id,
            deadline: self.deadline,
        })
    }
}

impl Drop for PendingCorrelation {
    fn drop(&mut self) {
        self.table.cancel(&self.correlation_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::{ReplyStatus, OK_REPLY};
    use bytes::Bytes;

    fn reply_for(correlation_id: CorrelationId) -> Reply {
        Reply {
            correlation_id,
            status: ReplyStatus::Ok,
            body: OK_REPLY.to_string(),
            backend_payload: Bytes::new(),
            redelivery_count: 0,
        }
    }

    #[tokio::test]
    async fn test_fulfill_delivers_once() {
        let table = Arc::new(CorrelationTable::new());
        let id = CorrelationId::new();
        let pending = table.register(id, Duration::from_secs(5));
        assert!(table.contains(&id));

        assert_eq!(table.fulfill(reply_for(id)), Fulfillment::Delivered);
        assert_eq!(table.fulfill(reply_for(id)), Fulfillment::Discarded);

        let reply = pending.wait().await.unwrap();
        assert_eq!(reply.correlation_id, id);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_deadline_unregisters_and_discards_late_reply() {
        let table = Arc::new(CorrelationTable::new());
        let id = CorrelationId::new();
        let pending = table.register(id, Duration::from_millis(30));

        let err = pending.wait().await.unwrap_err();
        match err {
            SendError::Timeout(cause) => {
                assert_eq!(cause.correlation_id, id);
                assert_eq!(cause.deadline, Duration::from_millis(30));
            }
            other => panic!("expected timeout, got {:?}", other),
        }

        assert!(!table.contains(&id));
        assert_eq!(table.fulfill(reply_for(id)), Fulfillment::Discarded);
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let table = Arc::new(CorrelationTable::new());
        let id = CorrelationId::new();
        let pending = table.register(id, Duration::from_secs(5));
        drop(pending);

        assert!(table.is_empty());
        assert_eq!(table.fulfill(reply_for(id)), Fulfillment::Discarded);
    }

    #[tokio::test]
    async fn test_close_all_wakes_waiters_with_closed() {
        let table = Arc::new(CorrelationTable::new());
        let pending = table.register(CorrelationId::new(), Duration::from_secs(5));
        table.close_all();

        assert!(matches!(pending.wait().await, Err(SendError::Closed)));
    }

    #[tokio::test]
    async fn test_concurrent_fulfill_only_one_wins() {
        let table = Arc::new(CorrelationTable::new());
        let id = CorrelationId::new();
        let pending = table.register(id, Duration::from_secs(5));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let table = table.clone();
            handles.push(tokio::spawn(async move { table.fulfill(reply_for(id)) }));
        }

        let mut delivered = 0;
        for handle in handles {
            if handle.await.unwrap() == Fulfillment::Delivered {
                delivered += 1;
            }
        }
        assert_eq!(delivered, 1);
        assert!(pending.wait().await.is_ok());
    }
}
