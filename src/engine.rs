//! Mediator assembly and worker pool.
//!
//! # Data Flow
//! ```text
//! MediatorBuilder::start
//!     → CorrelationTable, QueueBridge, TransactionController
//!     → N workers: loop { QueueBridge::receive → TransactionController::process }
//!
//! Mediator::shutdown
//!     → signal workers, close bridge
//!     → join workers (each finishes its current unit of work)
//!     → close all correlations (waiting callers get Closed)
//! ```

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::backend::invoker::{BackendError, BackendInvoker, HttpInvoker};
use crate::config::{ConfigError, MediatorConfig};
use crate::gateway::{CorrelationTable, Gateway};
use crate::lifecycle::Shutdown;
use crate::observability::metrics::MetricsError;
use crate::observability::stats::MediatorStats;
use crate::queue::bridge::QueueBridge;
use crate::queue::commit_log::{CommitLog, InMemoryCommitLog};
use crate::routing::policy::RedeliveryPolicy;
use crate::transaction::{DeliveryObserver, TransactionController};

/// Errors starting or running the mediator process.
#[derive(Debug, Error)]
pub enum MediatorError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),
}

/// Builder for a [`Mediator`].
pub struct MediatorBuilder {
    config: MediatorConfig,
    invoker: Option<Arc<dyn BackendInvoker>>,
    commit_log: Option<Arc<dyn CommitLog>>,
    observer: Option<Arc<dyn DeliveryObserver>>,
    policy: Option<RedeliveryPolicy>,
}

impl MediatorBuilder {
    /// Use a custom backend instead of the configured HTTP backend.
    pub fn invoker(mut self, invoker: Arc<dyn BackendInvoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    pub fn commit_log(mut self, commit_log: Arc<dyn CommitLog>) -> Self {
        self.commit_log = Some(commit_log);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn DeliveryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Override the redelivery policy derived from `[queue]`.
    pub fn policy(mut self, policy: RedeliveryPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Wire the components and spawn the worker pool.
    pub async fn start(self) -> Result<Mediator, MediatorError> {
        let config = self.config;

        let invoker: Arc<dyn BackendInvoker> = match self.invoker {
            Some(invoker) => invoker,
            None => Arc::new(HttpInvoker::from_config(&config.backend)?),
        };
        let commit_log = self
            .commit_log
            .unwrap_or_else(|| Arc::new(InMemoryCommitLog::default()));
        let policy = self
            .policy
            .unwrap_or_else(|| RedeliveryPolicy::from(&config.queue));

        let stats = Arc::new(MediatorStats::new());
        let correlations = Arc::new(CorrelationTable::new());
        let bridge = Arc::new(QueueBridge::new(policy, commit_log, Arc::clone(&stats)));
        let gateway = Gateway::new(
            Arc::clone(&correlations),
            Arc::clone(&bridge),
            Arc::clone(&stats),
            config.gateway.default_deadline(),
        );

        let mut controller = TransactionController::new(
            invoker,
            Arc::clone(&correlations),
            Arc::clone(&stats),
            config.backend.timeout(),
        );
        if let Some(observer) = self.observer {
            controller = controller.with_observer(observer);
        }

        let shutdown = Shutdown::new();
        let workers = (0..config.queue.workers)
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    Arc::clone(&bridge),
                    controller.clone(),
                    shutdown.subscribe(),
                ))
            })
            .collect();

        info!(
            workers = config.queue.workers,
            max_redeliveries = ?bridge.policy().max_redeliveries,
            backend_budget_ms = config.backend.timeout_ms,
            "Mediator started"
        );

        Ok(Mediator {
            gateway,
            bridge,
            correlations,
            stats,
            shutdown,
            workers,
        })
    }
}

async fn worker_loop(
    id: usize,
    bridge: Arc<QueueBridge>,
    controller: TransactionController,
    mut shutdown: broadcast::Receiver<()>,
) {
    debug!(worker = id, "Worker started");
    while let Some(delivery) = bridge.receive(&mut shutdown).await {
        controller.process(delivery).await;
    }
    debug!(worker = id, "Worker stopped");
}

/// A running mediator.
pub struct Mediator {
    gateway: Gateway,
    bridge: Arc<QueueBridge>,
    correlations: Arc<CorrelationTable>,
    stats: Arc<MediatorStats>,
    shutdown: Shutdown,
    workers: Vec<JoinHandle<()>>,
}

impl Mediator {
    pub fn builder(config: MediatorConfig) -> MediatorBuilder {
        MediatorBuilder {
            config,
            invoker: None,
            commit_log: None,
            observer: None,
            policy: None,
        }
    }

    /// Caller-facing handle. Cheap to clone.
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn stats(&self) -> &Arc<MediatorStats> {
        &self.stats
    }

    pub fn correlations(&self) -> &Arc<CorrelationTable> {
        &self.correlations
    }

    pub fn bridge(&self) -> &Arc<QueueBridge> {
        &self.bridge
    }

    /// Swap the redelivery policy at runtime.
    pub fn apply_policy(&self, policy: RedeliveryPolicy) {
        self.bridge.set_policy(policy);
    }

    /// Stop the workers and release every waiting caller.
    pub async fn shutdown(self) {
        info!("Mediator shutting down");
        self.shutdown.trigger();
        self.bridge.close();

        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Worker task failed");
            }
        }

        self.correlations.close_all();
        info!(
            queued = self.bridge.depth().await,
            "Mediator stopped"
        );
    }
}
