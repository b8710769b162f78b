use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::observability::stats::StatsSnapshot;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub queue_depth: usize,
    pub in_flight: usize,
    pub pending_correlations: usize,
    pub max_redeliveries: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CorrelationSummary {
    pub pending: usize,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let closed = state.bridge.is_closed();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if closed { "stopping" } else { "operational" },
        queue_depth: state.bridge.depth().await,
        in_flight: state.bridge.in_flight(),
        pending_correlations: state.correlations.len(),
        max_redeliveries: state.bridge.policy().max_redeliveries,
    })
}

pub async fn get_stats(State(state): State<AdminState>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot())
}

pub async fn get_correlations(State(state): State<AdminState>) -> Json<CorrelationSummary> {
    Json(CorrelationSummary {
        pending: state.correlations.len(),
    })
}
