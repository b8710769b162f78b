//! Outbound backend invocation.
//!
//! # Responsibilities
//! - POST the message body and headers to the backend
//! - Bound the whole exchange (connect, send, read body) by a time budget
//! - Turn transport failures and statuses into a [`BackendOutcome`]
//!
//! Never retries; a transient outcome is handed back to the router.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::backend::outcome::{BackendOutcome, OutcomeClassifier};
use crate::config::BackendConfig;
use crate::queue::message::Message;
use crate::resilience::timeouts::{with_budget, BudgetExceeded};

/// Header carrying the correlation ID to the backend.
pub const X_CORRELATION_ID: &str = "x-correlation-id";

/// Header carrying the redelivery counter to the backend.
pub const X_REDELIVERY_COUNT: &str = "x-redelivery-count";

/// Errors building an invoker.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Something that can be asked for a decision about a message.
#[async_trait]
pub trait BackendInvoker: Send + Sync {
    /// Call the backend once, within `budget`.
    async fn invoke(&self, message: &Message, budget: Duration) -> BackendOutcome;
}

/// HTTP backend invoker.
#[derive(Debug, Clone)]
pub struct HttpInvoker {
    client: Client,
    url: Url,
    classifier: OutcomeClassifier,
}

impl HttpInvoker {
    /// Build an invoker from configuration.
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        let url = Url::parse(&config.url)?;
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .pool_max_idle_per_host(8)
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            url,
            classifier: OutcomeClassifier::new(config),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn headers_for(message: &Message) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(message.headers.len() + 2);
        for (name, value) in &message.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => {
                    tracing::warn!(
                        correlation_id = %message.correlation_id,
                        header = %name,
                        "Dropping header that is not valid HTTP"
                    );
                }
            }
        }

        if let Ok(value) = HeaderValue::from_str(&message.correlation_id.to_string()) {
            headers.insert(X_CORRELATION_ID, value);
        }
        headers.insert(X_REDELIVERY_COUNT, HeaderValue::from(message.redelivery_count()));
        headers
    }
}

#[async_trait]
impl BackendInvoker for HttpInvoker {
    async fn invoke(&self, message: &Message, budget: Duration) -> BackendOutcome {
        let request = self
            .client
            .post(self.url.clone())
            .headers(Self::headers_for(message))
            .body(message.body.clone());

        let exchange = async {
            let response = request.send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        match with_budget(budget, exchange).await {
            Ok(Ok((status, body))) => self.classifier.classify(status, body),
            Ok(Err(e)) if e.is_timeout() => BackendOutcome::TimedOut(budget),
            Ok(Err(e)) => BackendOutcome::Unreachable(e.to_string()),
            Err(BudgetExceeded(budget)) => BackendOutcome::TimedOut(budget),
        }
    }
}
