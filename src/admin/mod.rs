//! Admin API: read-only views of the running mediator behind a bearer key.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::engine::Mediator;
use crate::gateway::CorrelationTable;
use crate::observability::stats::MediatorStats;
use crate::queue::bridge::QueueBridge;

#[derive(Clone)]
pub struct AdminState {
    pub stats: Arc<MediatorStats>,
    pub correlations: Arc<CorrelationTable>,
    pub bridge: Arc<QueueBridge>,
    pub api_key: Arc<String>,
}

impl AdminState {
    pub fn new(mediator: &Mediator, api_key: impl Into<String>) -> Self {
        Self {
            stats: Arc::clone(mediator.stats()),
            correlations: Arc::clone(mediator.correlations()),
            bridge: Arc::clone(mediator.bridge()),
            api_key: Arc::new(api_key.into()),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/stats", get(get_stats))
        .route("/admin/correlations", get(get_correlations))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
