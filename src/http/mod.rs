//! HTTP facade subsystem.
//!
//! # Data Flow
//! ```text
//! POST /requests
//!     → SetRequestId → Trace → Timeout
//!     → handle_request: forwarded headers + deadline
//!     → Gateway::send
//!     → 200 reply XML | 504 timed out | 503 shut down
//! ```

pub mod server;

pub use server::{AppState, HttpServer, X_DEADLINE_MS, X_REPLY_STATUS};
