//! Routing subsystem: the policy core.
//!
//! # Data Flow
//! ```text
//! BackendOutcome + redelivery count + redelivery cap
//!     → router.rs (pure decision)
//!     → RoutingDecision
//!         ReplySuccess / ReplyRejection / Abandon → commit + reply
//!         RetryLater                              → rollback + redeliver
//! ```
//!
//! # Design Decisions
//! - Failures arrive as explicit outcomes; nothing is caught to pick a route
//! - Authorization rejections are terminal: retrying cannot change an access decision
//! - Transient failures retry forever unless a cap is configured
//! - Delays live in policy.rs; the decision itself knows nothing about time

pub mod decision;
pub mod policy;
pub mod router;

pub use decision::RoutingDecision;
pub use policy::RedeliveryPolicy;
pub use router::decide;
