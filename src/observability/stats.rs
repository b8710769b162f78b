//! In-process counters for the admin API and tests.
//!
//! Every recorder also feeds the matching Prometheus metric.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::observability::metrics;
use crate::reply::ReplyStatus;

#[derive(Debug, Default)]
pub struct MediatorStats {
    enqueued: AtomicU64,
    deliveries: AtomicU64,
    rollbacks: AtomicU64,
    commits: AtomicU64,
    commit_failures: AtomicU64,
    replies_ok: AtomicU64,
    replies_rejected: AtomicU64,
    replies_abandoned: AtomicU64,
    exchange_timeouts: AtomicU64,
    late_replies_discarded: AtomicU64,
}

/// Point-in-time copy of [`MediatorStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub enqueued: u64,
    pub deliveries: u64,
    pub rollbacks: u64,
    pub commits: u64,
    pub commit_failures: u64,
    pub replies_ok: u64,
    pub replies_rejected: u64,
    pub replies_abandoned: u64,
    pub exchange_timeouts: u64,
    pub late_replies_discarded: u64,
}

impl MediatorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        metrics::record_enqueued();
    }

    pub fn record_delivery(&self, redelivery: bool) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
        metrics::record_delivery(redelivery);
    }

    pub fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
        metrics::record_rollback();
    }

    pub fn record_commit(&self, status: ReplyStatus) {
        self.commits.fetch_add(1, Ordering::Relaxed);
        let counter = match status {
            ReplyStatus::Ok => &self.replies_ok,
            ReplyStatus::Rejected => &self.replies_rejected,
            ReplyStatus::Abandoned => &self.replies_abandoned,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_commit_failure(&self) {
        self.commit_failures.fetch_add(1, Ordering::Relaxed);
        metrics::record_commit_failure();
    }

    pub fn record_exchange_timeout(&self) {
        self.exchange_timeouts.fetch_add(1, Ordering::Relaxed);
        metrics::record_exchange_timeout();
    }

    pub fn record_late_reply_discarded(&self) {
        self.late_replies_discarded.fetch_add(1, Ordering::Relaxed);
        metrics::record_late_reply_discarded();
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            commit_failures: self.commit_failures.load(Ordering::Relaxed),
            replies_ok: self.replies_ok.load(Ordering::Relaxed),
            replies_rejected: self.replies_rejected.load(Ordering::Relaxed),
            replies_abandoned: self.replies_abandoned.load(Ordering::Relaxed),
            exchange_timeouts: self.exchange_timeouts.load(Ordering::Relaxed),
            late_replies_discarded: self.late_replies_discarded.load(Ordering::Relaxed),
        }
    }
}
