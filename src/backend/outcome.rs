//! Backend outcomes and response classification.

use std::time::Duration;

use bytes::Bytes;

use crate::config::BackendConfig;

/// Result of exactly one backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendOutcome {
    /// The backend accepted the request.
    Accepted(Bytes),
    /// The backend denied access. Terminal.
    Rejected(Bytes),
    /// The backend could not be reached or is failing. Transient.
    Unreachable(String),
    /// The call exceeded its time budget. Transient.
    TimedOut(Duration),
}

impl BackendOutcome {
    /// Transient outcomes drive redelivery rather than a reply.
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendOutcome::Unreachable(_) | BackendOutcome::TimedOut(_))
    }

    /// Metric/log label.
    pub fn label(&self) -> &'static str {
        match self {
            BackendOutcome::Accepted(_) => "accepted",
            BackendOutcome::Rejected(_) => "rejected",
            BackendOutcome::Unreachable(_) => "unreachable",
            BackendOutcome::TimedOut(_) => "timed_out",
        }
    }
}

/// Maps an HTTP status and payload to a [`BackendOutcome`].
#[derive(Debug, Clone)]
pub struct OutcomeClassifier {
    success_marker: String,
    denied_marker: String,
    rejection_statuses: Vec<u16>,
    transient_statuses: Vec<u16>,
}

impl OutcomeClassifier {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            success_marker: config.success_marker.clone(),
            denied_marker: config.denied_marker.clone(),
            rejection_statuses: config.rejection_statuses.clone(),
            transient_statuses: config.transient_statuses.clone(),
        }
    }

    /// Classify a completed HTTP exchange.
    ///
    /// - configured transient statuses (408, 429) → `Unreachable`
    /// - configured rejection statuses and other 4xx → `Rejected`
    /// - 5xx and unexpected statuses → `Unreachable`
    /// - 2xx whose `<status>` is the denied marker → `Rejected`
    /// - 2xx whose `<status>` is the success marker → `Accepted`
    /// - any other 2xx → `Unreachable`, so it is redelivered
    pub fn classify(&self, status: u16, body: Bytes) -> BackendOutcome {
        if self.transient_statuses.contains(&status) {
            return BackendOutcome::Unreachable(format!("backend returned HTTP {}", status));
        }

        if self.rejection_statuses.contains(&status) || (400..500).contains(&status) {
            return BackendOutcome::Rejected(body);
        }

        if !(200..300).contains(&status) {
            return BackendOutcome::Unreachable(format!("backend returned HTTP {}", status));
        }

        let marker = status_marker(&body);
        if marker == self.denied_marker {
            BackendOutcome::Rejected(body)
        } else if marker == self.success_marker {
            BackendOutcome::Accepted(body)
        } else {
            BackendOutcome::Unreachable(format!("unrecognised status marker {:?}", marker))
        }
    }
}

/// Extract the text of the first `<status>` element, or the trimmed body when
/// there is none.
pub fn status_marker(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let inner = text
        .find("<status>")
        .map(|start| &text[start + "<status>".len()..])
        .and_then(|rest| rest.find("</status>").map(|end| &rest[..end]));

    match inner {
        Some(marker) => marker.trim().to_string(),
        None => text.trim().to_string(),
    }
}
