//! Transaction controller: one delivery, one unit of work.
//!
//! # Data Flow
//! ```text
//! Delivery
//!     → BackendInvoker::invoke (bounded by the backend budget)
//!     → routing::decide
//!     → reply::compose
//!         None        → rollback (redelivery)
//!         Some(reply) → commit → CorrelationTable::fulfill
//! ```
//!
//! # Invariants
//! - A reply is handed to the caller only after its commit succeeded.
//! - A failed commit rolls back; no reply is sent for that attempt.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn, Instrument};

use crate::backend::invoker::BackendInvoker;
use crate::backend::outcome::BackendOutcome;
use crate::gateway::correlation::{CorrelationTable, Fulfillment};
use crate::observability::metrics;
use crate::observability::stats::MediatorStats;
use crate::queue::delivery::Delivery;
use crate::reply::{self, ReplyStatus};
use crate::resilience::timeouts::{with_budget, BudgetExceeded};
use crate::routing::decision::RoutingDecision;
use crate::routing::router;
use crate::transaction::observer::DeliveryObserver;

/// How a unit of work ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    /// Committed and a reply was produced.
    Committed(ReplyStatus),
    /// Rolled back for redelivery.
    RolledBack,
    /// The commit failed and the delivery was rolled back.
    CommitFailed,
}

#[derive(Clone)]
pub struct TransactionController {
    invoker: Arc<dyn BackendInvoker>,
    correlations: Arc<CorrelationTable>,
    stats: Arc<MediatorStats>,
    observer: Option<Arc<dyn DeliveryObserver>>,
    budget: Duration,
}

impl TransactionController {
    pub fn new(
        invoker: Arc<dyn BackendInvoker>,
        correlations: Arc<CorrelationTable>,
        stats: Arc<MediatorStats>,
        budget: Duration,
    ) -> Self {
        Self {
            invoker,
            correlations,
            stats,
            observer: None,
            budget,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn DeliveryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run one unit of work to completion.
    pub async fn process(&self, delivery: Delivery) -> UnitOutcome {
        let span = tracing::info_span!(
            "unit_of_work",
            correlation_id = %delivery.message().correlation_id,
            message_id = %delivery.message().id,
            redelivery_count = delivery.message().redelivery_count(),
        );
        self.run(delivery).instrument(span).await
    }

    async fn run(&self, delivery: Delivery) -> UnitOutcome {
        let message = delivery.message();

        let started = Instant::now();
        let outcome = match with_budget(self.budget, self.invoker.invoke(message, self.budget)).await {
            Ok(outcome) => outcome,
            Err(BudgetExceeded(budget)) => BackendOutcome::TimedOut(budget),
        };
        metrics::record_backend_call(outcome.label(), started.elapsed());
        debug!(
            outcome = outcome.label(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Backend call finished"
        );

        let decision = router::decide(outcome, message.redelivery_count(), message.max_redeliveries);
        metrics::record_decision(decision.label());
        if let Some(observer) = &self.observer {
            observer.on_decision(message, &decision);
        }

        let Some(reply) = reply::compose(&decision, message) else {
            warn!(decision = decision.label(), "Transient backend failure, rolling back");
            delivery.rollback();
            return UnitOutcome::RolledBack;
        };

        if let RoutingDecision::Abandon(cause) = &decision {
            error!(decision = decision.label(), cause = %cause, "Giving up on message");
        }

        let status = reply.status;
        if let Err(e) = delivery.commit() {
            warn!(error = %e, "Commit failed, reply withheld");
            return UnitOutcome::CommitFailed;
        }
        self.stats.record_commit(status);

        match self.correlations.fulfill(reply) {
            Fulfillment::Delivered => {
                info!(decision = decision.label(), status = status.as_str(), "Reply delivered to caller");
            }
            Fulfillment::Discarded => {
                self.stats.record_late_reply_discarded();
                metrics::record_late_reply_discarded();
                info!(
                    decision = decision.label(),
                    status = status.as_str(),
                    "Caller no longer waiting, reply discarded"
                );
            }
        }
        UnitOutcome::Committed(status)
    }
}
