//! Inbound HTTP facade.
//!
//! # Responsibilities
//! - Accept `POST /requests` and hand the body to the gateway
//! - Forward the `user` header and `x-header-*` headers to the message
//! - Map the reply or error to an HTTP response
//! - Wire up middleware (request ID, tracing, request timeout)

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::backend::invoker::X_CORRELATION_ID;
use crate::config::ListenerConfig;
use crate::error::SendError;
use crate::gateway::Gateway;
use crate::queue::message::Headers;

/// Caller-supplied deadline in milliseconds.
pub const X_DEADLINE_MS: &str = "x-deadline-ms";

/// Terminal status of the reply (`ok`, `rejected`, `abandoned`).
pub const X_REPLY_STATUS: &str = "x-reply-status";

/// Prefix of inbound headers copied onto the message, with the prefix removed.
pub const FORWARDED_HEADER_PREFIX: &str = "x-header-";

/// Inbound header copied onto the message unchanged.
pub const USER_HEADER: &str = "user";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
}

/// HTTP server for the request/reply facade.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ListenerConfig, state: AppState) -> Self {
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ListenerConfig, state: AppState) -> Router {
        Router::new()
            .route("/requests", post(handle_request))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for serving it elsewhere or driving it in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn handle_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let deadline = match parse_deadline(&headers) {
        Ok(deadline) => deadline,
        Err(response) => return response,
    };

    match state.gateway.send(body, forwarded_headers(&headers), deadline).await {
        Ok(reply) => {
            let mut response = (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/xml")],
                reply.body,
            )
                .into_response();
            let response_headers = response.headers_mut();
            response_headers.insert(
                HeaderName::from_static(X_REPLY_STATUS),
                HeaderValue::from_static(reply.status.as_str()),
            );
            if let Ok(value) = HeaderValue::from_str(&reply.correlation_id.to_string()) {
                response_headers.insert(HeaderName::from_static(X_CORRELATION_ID), value);
            }
            response
        }
        Err(SendError::Timeout(cause)) => {
            (StatusCode::GATEWAY_TIMEOUT, cause.to_string()).into_response()
        }
        Err(SendError::Closed) => {
            (StatusCode::SERVICE_UNAVAILABLE, "mediator is shut down").into_response()
        }
    }
}

fn parse_deadline(headers: &HeaderMap) -> Result<Option<Duration>, Response> {
    let Some(raw) = headers.get(X_DEADLINE_MS) else {
        return Ok(None);
    };

    match raw.to_str().ok().and_then(|v| v.trim().parse::<u64>().ok()) {
        Some(ms) if ms > 0 => Ok(Some(Duration::from_millis(ms))),
        _ => Err((
            StatusCode::BAD_REQUEST,
            format!("{} must be a positive integer", X_DEADLINE_MS),
        )
            .into_response()),
    }
}

/// Headers carried onto the message: `user` as is, `x-header-<name>` as `<name>`.
pub fn forwarded_headers(headers: &HeaderMap) -> Headers {
    let mut forwarded = Headers::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        let name = name.as_str();
        if name == USER_HEADER {
            forwarded.insert(USER_HEADER.to_string(), value.to_string());
        } else if let Some(stripped) = name.strip_prefix(FORWARDED_HEADER_PREFIX) {
            if !stripped.is_empty() {
                forwarded.insert(stripped.to_string(), value.to_string());
            }
        }
    }
    forwarded
}
