//! Reply composition.
//!
//! Maps a terminal [`RoutingDecision`] to the canonical reply returned to the
//! caller. The body is always one of a fixed set of XML documents, so a caller
//! never sees a partial or backend-shaped payload.

use bytes::Bytes;
use serde::Serialize;

use crate::queue::message::{CorrelationId, Message};
use crate::routing::decision::RoutingDecision;

pub const OK_REPLY: &str = r#"<?xml version="1.0"?><reply><status>ok</status></reply>"#;
pub const ACCESS_DENIED_REPLY: &str =
    r#"<?xml version="1.0"?><reply><status>Access denied</status></reply>"#;
pub const UNAVAILABLE_REPLY: &str =
    r#"<?xml version="1.0"?><reply><status>Service unavailable</status></reply>"#;

/// Terminal status of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Ok,
    Rejected,
    Abandoned,
}

impl ReplyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyStatus::Ok => "ok",
            ReplyStatus::Rejected => "rejected",
            ReplyStatus::Abandoned => "abandoned",
        }
    }
}

/// The one reply a caller receives for a correlation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub correlation_id: CorrelationId,
    pub status: ReplyStatus,
    /// Canonical reply document.
    pub body: String,
    /// What the backend returned (empty for abandon).
    pub backend_payload: Bytes,
    /// Redelivery counter of the delivery that reached the terminal decision.
    pub redelivery_count: u32,
}

/// Build the reply for a terminal decision. Returns `None` for `RetryLater`.
pub fn compose(decision: &RoutingDecision, message: &Message) -> Option<Reply> {
    let (status, body, backend_payload) = match decision {
        RoutingDecision::ReplySuccess(payload) => (ReplyStatus::Ok, OK_REPLY, payload.clone()),
        RoutingDecision::ReplyRejection(payload) => {
            (ReplyStatus::Rejected, ACCESS_DENIED_REPLY, payload.clone())
        }
        RoutingDecision::Abandon(_) => (ReplyStatus::Abandoned, UNAVAILABLE_REPLY, Bytes::new()),
        RoutingDecision::RetryLater => return None,
    };

    Some(Reply {
        correlation_id: message.correlation_id,
        status,
        body: body.to_string(),
        backend_payload,
        redelivery_count: message.redelivery_count(),
    })
}
