//! Outcome-to-decision routing.
//!
//! | outcome                | decision                                    |
//! |------------------------|---------------------------------------------|
//! | Accepted(p)            | ReplySuccess(p)                             |
//! | Rejected(p)            | ReplyRejection(p), never retried            |
//! | Unreachable / TimedOut | RetryLater, or Abandon once the cap is hit  |
//!
//! The function is pure: no I/O, no clock.

use crate::backend::outcome::BackendOutcome;
use crate::routing::decision::RoutingDecision;

/// Decide what happens to a message after a backend call.
///
/// `redelivery_count` is the counter of the delivery that produced `outcome`;
/// `max_redeliveries` of `None` retries transient failures forever.
pub fn decide(
    outcome: BackendOutcome,
    redelivery_count: u32,
    max_redeliveries: Option<u32>,
) -> RoutingDecision {
    match outcome {
        BackendOutcome::Accepted(payload) => RoutingDecision::ReplySuccess(payload),
        BackendOutcome::Rejected(payload) => RoutingDecision::ReplyRejection(payload),
        transient => match max_redeliveries {
            Some(max) if redelivery_count >= max => {
                RoutingDecision::Abandon(transient_cause(&transient, redelivery_count))
            }
            _ => RoutingDecision::RetryLater,
        },
    }
}

fn transient_cause(outcome: &BackendOutcome, redelivery_count: u32) -> String {
    match outcome {
        BackendOutcome::Unreachable(cause) => {
            format!("backend unreachable after {} redeliveries: {}", redelivery_count, cause)
        }
        BackendOutcome::TimedOut(budget) => {
            format!("backend timed out after {} redeliveries (budget {:?})", redelivery_count, budget)
        }
        other => format!("unexpected outcome {}", other.label()),
    }
}
