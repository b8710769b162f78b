//! Caller-facing request/reply gateway.
//!
//! # Data Flow
//! ```text
//! send(body, headers, deadline)
//!     → new CorrelationId, register reply slot
//!     → enqueue Message (redelivery_count = 0)
//!     → wait for the slot or the deadline
//! ```
//!
//! A timeout only ends the caller's wait. The message stays in the queue and
//! keeps being redelivered; its eventual reply is discarded.

pub mod correlation;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::SendError;
use crate::observability::metrics;
use crate::observability::stats::MediatorStats;
use crate::queue::bridge::QueueBridge;
use crate::queue::message::{CorrelationId, Headers};
use crate::reply::Reply;

pub use correlation::{CorrelationTable, Fulfillment, PendingCorrelation};

#[derive(Debug, Clone)]
pub struct Gateway {
    correlations: Arc<CorrelationTable>,
    bridge: Arc<QueueBridge>,
    stats: Arc<MediatorStats>,
    default_deadline: Duration,
}

impl Gateway {
    pub fn new(
        correlations: Arc<CorrelationTable>,
        bridge: Arc<QueueBridge>,
        stats: Arc<MediatorStats>,
        default_deadline: Duration,
    ) -> Self {
        Self {
            correlations,
            bridge,
            stats,
            default_deadline,
        }
    }

    pub fn default_deadline(&self) -> Duration {
        self.default_deadline
    }

    /// Submit a request and wait for its reply.
    ///
    /// `deadline` defaults to the configured gateway deadline.
    pub async fn send(
        &self,
        body: impl Into<Bytes>,
        headers: Headers,
        deadline: Option<Duration>,
    ) -> Result<Reply, SendError> {
        let deadline = deadline.unwrap_or(self.default_deadline);
        let correlation_id = CorrelationId::new();

        let pending = self.correlations.register(correlation_id, deadline);
        let message = self.bridge.new_message(correlation_id, body.into(), headers);
        debug!(
            correlation_id = %correlation_id,
            message_id = %message.id,
            deadline_ms = deadline.as_millis() as u64,
            "Request accepted"
        );
        self.bridge.enqueue(message).await?;

        match pending.wait().await {
            Ok(reply) => {
                debug!(
                    correlation_id = %correlation_id,
                    status = reply.status.as_str(),
                    redelivery_count = reply.redelivery_count,
                    "Reply delivered"
                );
                Ok(reply)
            }
            Err(SendError::Timeout(cause)) => {
                self.stats.record_exchange_timeout();
                metrics::record_exchange_timeout();
                warn!(
                    correlation_id = %correlation_id,
                    deadline_ms = deadline.as_millis() as u64,
                    "Exchange timed out, message remains queued"
                );
                Err(SendError::Timeout(cause))
            }
            Err(e) => Err(e),
        }
    }

    /// Submit a request carrying a single header, with the default deadline.
    pub async fn send_with_header(
        &self,
        body: impl Into<Bytes>,
        name: &str,
        value: &str,
    ) -> Result<Reply, SendError> {
        let mut headers = Headers::new();
        headers.insert(name.to_string(), value.to_string());
        self.send(body, headers, None).await
    }
}
