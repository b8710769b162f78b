//! Routing decisions.

use bytes::Bytes;

/// What to do with a message after one backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Reply with success, carrying the backend payload.
    ReplySuccess(Bytes),
    /// Reply with an access-denied rejection, carrying the backend payload.
    ReplyRejection(Bytes),
    /// Roll back so the message is redelivered.
    RetryLater,
    /// Give up on a transient failure and reply with the cause.
    Abandon(String),
}

impl RoutingDecision {
    /// Terminal decisions end the message lifecycle with a commit.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RoutingDecision::RetryLater)
    }

    /// Metric/log label.
    pub fn label(&self) -> &'static str {
        match self {
            RoutingDecision::ReplySuccess(_) => "reply_success",
            RoutingDecision::ReplyRejection(_) => "reply_rejection",
            RoutingDecision::RetryLater => "retry_later",
            RoutingDecision::Abandon(_) => "abandon",
        }
    }
}
