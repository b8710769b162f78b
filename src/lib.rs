//! Transactional request/reply mediation library.

pub mod admin;
pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod queue;
pub mod reply;
pub mod resilience;
pub mod routing;
pub mod transaction;

pub use config::schema::MediatorConfig;
pub use engine::{Mediator, MediatorBuilder, MediatorError};
pub use error::{ExchangeTimedOut, SendError};
pub use gateway::Gateway;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use reply::{Reply, ReplyStatus};
