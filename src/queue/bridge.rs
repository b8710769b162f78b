//! In-memory queue bridge.
//!
//! # Invariants
//! - A message is in exactly one place: pending, scheduled for redelivery,
//!   or in flight with one worker. Attempts for one correlation are
//!   therefore strictly sequential.
//! - A rolled-back message goes to the front of the queue once its
//!   redelivery delay has passed, with its counter incremented.
//! - Closing stops new enqueues and worker receives. Pending and scheduled
//!   messages are kept.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, Mutex, Notify};
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};
use crate::observability::metrics;
use crate::observability::stats::MediatorStats;
use crate::queue::commit_log::CommitLog;
use crate::queue::delivery::Delivery;
use crate::queue::message::{CorrelationId, Headers, Message};
use crate::routing::policy::RedeliveryPolicy;

pub struct QueueBridge {
    pending: Mutex<VecDeque<Message>>,
    available: Notify,
    in_flight: AtomicUsize,
    scheduled: AtomicUsize,
    closed: AtomicBool,
    policy: ArcSwap<RedeliveryPolicy>,
    commit_log: Arc<dyn CommitLog>,
    stats: Arc<MediatorStats>,
}

impl std::fmt::Debug for QueueBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueBridge")
            .field("in_flight", &self.in_flight())
            .field("scheduled", &self.scheduled())
            .field("closed", &self.is_closed())
            .field("policy", &self.policy())
            .finish_non_exhaustive()
    }
}

impl QueueBridge {
    pub fn new(
        policy: RedeliveryPolicy,
        commit_log: Arc<dyn CommitLog>,
        stats: Arc<MediatorStats>,
    ) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            available: Notify::new(),
            in_flight: AtomicUsize::new(0),
            scheduled: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            policy: ArcSwap::from_pointee(policy),
            commit_log,
            stats,
        }
    }

    /// Current redelivery policy.
    pub fn policy(&self) -> Arc<RedeliveryPolicy> {
        self.policy.load_full()
    }

    /// Replace the redelivery policy. Messages already enqueued keep the cap
    /// they were created with; the new delay applies to the next rollback.
    pub fn set_policy(&self, policy: RedeliveryPolicy) {
        info!(
            max_redeliveries = ?policy.max_redeliveries,
            delay_ms = policy.delay.as_millis() as u64,
            exponential = policy.exponential,
            "Redelivery policy updated"
        );
        self.policy.store(Arc::new(policy));
    }

    /// Build a message stamped with the current redelivery cap.
    pub fn new_message(&self, correlation_id: CorrelationId, body: Bytes, headers: Headers) -> Message {
        Message::new(correlation_id, body, headers, self.policy.load().max_redeliveries)
    }

    /// Append a message to the queue.
    pub async fn enqueue(&self, message: Message) -> QueueResult<()> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }

        let depth = {
            let mut pending = self.pending.lock().await;
            pending.push_back(message);
            pending.len()
        };

        self.stats.record_enqueued();
        metrics::record_enqueued();
        metrics::set_queue_depth(depth);
        self.available.notify_one();
        Ok(())
    }

    /// Wait for the next message. Returns `None` once the bridge is closed or
    /// shutdown is signalled.
    pub async fn receive(self: &Arc<Self>, shutdown: &mut broadcast::Receiver<()>) -> Option<Delivery> {
        loop {
            if self.is_closed() {
                return None;
            }

            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(message) = self.pop_next().await {
                self.in_flight.fetch_add(1, Ordering::SeqCst);
                self.stats.record_delivery(message.is_redelivery());
                metrics::record_delivery(message.is_redelivery());
                return Some(Delivery::new(message, Arc::clone(self)));
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = shutdown.recv() => return None,
            }
        }
    }

    async fn pop_next(&self) -> Option<Message> {
        let mut pending = self.pending.lock().await;
        while let Some(message) = pending.pop_front() {
            if self.commit_log.is_committed(&message.id) {
                debug!(message_id = %message.id, "Skipping already committed message");
                continue;
            }
            if !pending.is_empty() {
                self.available.notify_one();
            }
            metrics::set_queue_depth(pending.len());
            return Some(message);
        }
        None
    }

    /// Record the commit and release the in-flight slot. A failed commit is
    /// rolled back.
    pub(crate) fn commit(self: &Arc<Self>, message: Message) -> QueueResult<()> {
        match self.commit_log.record_commit(&message) {
            Ok(()) => {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                debug!(
                    correlation_id = %message.correlation_id,
                    message_id = %message.id,
                    "Committed"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    correlation_id = %message.correlation_id,
                    error = %e,
                    "Commit failed, rolling back"
                );
                self.stats.record_commit_failure();
                metrics::record_commit_failure();
                self.redeliver(message);
                Err(e)
            }
        }
    }

    /// Roll back an in-flight message: bump its counter and put it back at the
    /// front of the queue after the redelivery delay.
    ///
    /// Ordering is per correlation only. While the message waits out its
    /// delay, newer unrelated messages may be delivered ahead of it; once the
    /// delay has passed it goes ahead of everything still pending.
    pub(crate) fn redeliver(self: &Arc<Self>, mut message: Message) {
        message.mark_redelivered();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.scheduled.fetch_add(1, Ordering::SeqCst);
        self.stats.record_rollback();
        metrics::record_rollback();

        let delay = self.policy.load().delay_for(message.redelivery_count());
        debug!(
            correlation_id = %message.correlation_id,
            redelivery_count = message.redelivery_count(),
            delay_ms = delay.as_millis() as u64,
            "Rolled back, scheduling redelivery"
        );

        match Handle::try_current() {
            Ok(handle) => {
                let bridge = Arc::clone(self);
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    bridge.requeue_front(message).await;
                });
            }
            Err(_) => {
                // Outside a runtime there is no task to wait out the delay.
                self.pending.blocking_lock().push_front(message);
                self.scheduled.fetch_sub(1, Ordering::SeqCst);
                self.available.notify_one();
            }
        }
    }

    async fn requeue_front(&self, message: Message) {
        let depth = {
            let mut pending = self.pending.lock().await;
            pending.push_front(message);
            pending.len()
        };
        self.scheduled.fetch_sub(1, Ordering::SeqCst);
        metrics::set_queue_depth(depth);
        self.available.notify_one();
    }

    /// Stop accepting and handing out messages.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Queue bridge closed");
        }
        self.available.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Messages waiting for a worker, including those scheduled for
    /// redelivery.
    pub async fn depth(&self) -> usize {
        self.pending.lock().await.len() + self.scheduled()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn scheduled(&self) -> usize {
        self.scheduled.load(Ordering::SeqCst)
    }
}
