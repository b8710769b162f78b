//! Backend invocation subsystem.
//!
//! # Data Flow
//! ```text
//! Message (body, headers, correlation id, redelivery count)
//!     → invoker.rs (HTTP POST under a time budget)
//!     → outcome.rs (status + payload → BackendOutcome)
//!     → routing (decision)
//! ```
//!
//! # Design Decisions
//! - Failures are values, not errors: every call yields a BackendOutcome
//! - Connection failures and 5xx are transient; 4xx and denied markers are terminal
//! - `BackendInvoker` is a trait so the transaction controller can be driven
//!   by any collaborator

pub mod invoker;
pub mod outcome;

pub use invoker::{BackendError, BackendInvoker, HttpInvoker};
pub use outcome::{BackendOutcome, OutcomeClassifier};
