//! Hook for watching routing decisions as they are made.

use crate::queue::message::Message;
use crate::routing::decision::RoutingDecision;

/// Notified once per delivery, after routing and before the unit of work is
/// settled. Must not block.
pub trait DeliveryObserver: Send + Sync {
    fn on_decision(&self, message: &Message, decision: &RoutingDecision);
}
