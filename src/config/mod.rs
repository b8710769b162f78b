//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MediatorConfig (validated, immutable)
//!     → handed to Mediator::builder at startup
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads + validates new config
//!     → queue.* section becomes a new RedeliveryPolicy
//!     → atomic swap inside the queue bridge
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - `queue.max_redeliveries` is optional; absent means retry forever

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, BackendConfig, GatewayConfig, ListenerConfig, LogFormat, MediatorConfig,
    ObservabilityConfig, QueueConfig,
};
