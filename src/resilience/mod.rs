//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Backend call:
//!     → timeouts.rs (bound the call by its time budget)
//!
//! Rollback:
//!     → backoff.rs (delay before the message is redelivered)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every backend call has a deadline
//! - No retries here: redelivery is decided by the routing policy and
//!   performed by the queue bridge
//! - Jittered backoff prevents thundering herd when a backend recovers

pub mod backoff;
pub mod timeouts;
