//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! gateway / queue / transaction controller produce:
//!     → logging.rs (structured events keyed by correlation_id / message_id)
//!     → stats.rs (in-process counters, served by the admin API)
//!     → metrics.rs (Prometheus counters, gauges, histograms)
//! ```
//!
//! # Design Decisions
//! - Correlation ID flows through every log event of a message lifecycle
//! - Metrics are cheap (atomic increments) and no-ops without an exporter

pub mod logging;
pub mod metrics;
pub mod stats;

pub use stats::{MediatorStats, StatsSnapshot};
