//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mediator_messages_enqueued_total` (counter)
//! - `mediator_deliveries_total{redelivery}` (counter)
//! - `mediator_decisions_total{decision}` (counter)
//! - `mediator_rollbacks_total` (counter)
//! - `mediator_commit_failures_total` (counter)
//! - `mediator_exchange_timeouts_total` (counter)
//! - `mediator_late_replies_discarded_total` (counter)
//! - `mediator_backend_call_duration_seconds{outcome}` (histogram)
//! - `mediator_pending_correlations` (gauge)
//! - `mediator_queue_depth` (gauge)
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to install Prometheus exporter: {0}")]
    Install(#[from] BuildError),
}

/// Install the Prometheus exporter with an HTTP scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )?
        .install()?;

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_enqueued() {
    counter!("mediator_messages_enqueued_total").increment(1);
}

pub fn record_delivery(redelivery: bool) {
    let label = if redelivery { "true" } else { "false" };
    counter!("mediator_deliveries_total", "redelivery" => label).increment(1);
}

pub fn record_backend_call(outcome: &'static str, elapsed: Duration) {
    histogram!("mediator_backend_call_duration_seconds", "outcome" => outcome)
        .record(elapsed.as_secs_f64());
}

pub fn record_decision(decision: &'static str) {
    counter!("mediator_decisions_total", "decision" => decision).increment(1);
}

pub fn record_rollback() {
    counter!("mediator_rollbacks_total").increment(1);
}

pub fn record_commit_failure() {
    counter!("mediator_commit_failures_total").increment(1);
}

pub fn record_exchange_timeout() {
    counter!("mediator_exchange_timeouts_total").increment(1);
}

pub fn record_late_reply_discarded() {
    counter!("mediator_late_replies_discarded_total").increment(1);
}

pub fn set_pending_correlations(count: usize) {
    gauge!("mediator_pending_correlations").set(count as f64);
}

pub fn set_queue_depth(depth: usize) {
    gauge!("mediator_queue_depth").set(depth as f64);
}
