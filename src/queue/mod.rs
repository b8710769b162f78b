//! Queue bridge subsystem.
//!
//! # Data Flow
//! ```text
//! Gateway::send
//!     → QueueBridge::enqueue (back of queue)
//!     → worker: QueueBridge::receive → Delivery
//!     → Delivery::commit   (consumed, recorded in CommitLog)
//!       Delivery::rollback (redelivery_count + 1, front of queue after delay)
//! ```

pub mod bridge;
pub mod commit_log;
pub mod delivery;
pub mod message;

pub use bridge::QueueBridge;
pub use commit_log::{CommitLog, InMemoryCommitLog};
pub use delivery::Delivery;
pub use message::{CorrelationId, Headers, Message, MessageId};
