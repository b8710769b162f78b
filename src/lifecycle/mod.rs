//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Tracing/metrics → Mediator → Listeners
//!
//! Shutdown:
//!     Signal received → Listeners stop → Workers finish current unit → Exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
