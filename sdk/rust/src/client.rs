use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;

/// What happened to one request sent through the mediator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RequestOutcome {
    /// A terminal reply: `status` is `ok`, `rejected` or `abandoned`.
    Reply { status: String, body: String },
    /// The caller deadline elapsed before a reply.
    TimedOut,
    /// The mediator refused the request (shut down or bad input).
    Unavailable(u16),
}

pub struct MediatorClient {
    client: Client,
    base_url: String,
}

impl MediatorClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Use a preconfigured HTTP client (proxies, timeouts, TLS).
    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Send a request body as `user`, optionally overriding the deadline.
    pub async fn send(
        &self,
        body: impl Into<String>,
        user: &str,
        deadline: Option<Duration>,
    ) -> Result<RequestOutcome, reqwest::Error> {
        let mut request = self
            .client
            .post(format!("{}/requests", self.base_url))
            .header("user", user)
            .header("content-type", "application/xml")
            .body(body.into());
        if let Some(deadline) = deadline {
            request = request.header("x-deadline-ms", deadline.as_millis().to_string());
        }

        let resp = request.send().await?;
        let status = resp.status();
        let reply_status = resp
            .headers()
            .get("x-reply-status")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match status {
            StatusCode::OK => Ok(RequestOutcome::Reply {
                status: reply_status.unwrap_or_default(),
                body: resp.text().await?,
            }),
            StatusCode::GATEWAY_TIMEOUT => Ok(RequestOutcome::TimedOut),
            other => Ok(RequestOutcome::Unavailable(other.as_u16())),
        }
    }

    /// Fetch an admin endpoint (e.g. `/admin/stats`) as JSON.
    pub async fn admin_get(
        &self,
        path: &str,
        api_key: &str,
    ) -> Result<serde_json::Value, reqwest::Error> {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}
