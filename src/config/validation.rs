//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, workers > 0)
//! - Check the backend URL parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MediatorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{MediatorConfig, ADMIN_KEY_PLACEHOLDER};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("queue.workers must be greater than zero")]
    NoWorkers,

    #[error("backend.url is invalid: {0}")]
    InvalidBackendUrl(String),

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("queue.redelivery_max_delay_ms ({max}) is below queue.redelivery_delay_ms ({base})")]
    DelayBounds { base: u64, max: u64 },

    #[error("admin.api_key must be changed when the admin API is enabled")]
    PlaceholderAdminKey,

    #[error("backend.denied_marker and backend.success_marker must differ")]
    AmbiguousMarkers,

    #[error("HTTP status {0} is in both backend.transient_statuses and backend.rejection_statuses")]
    ConflictingStatus(u16),
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &MediatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.queue.workers == 0 {
        errors.push(ValidationError::NoWorkers);
    }

    if let Err(e) = url::Url::parse(&config.backend.url) {
        errors.push(ValidationError::InvalidBackendUrl(e.to_string()));
    }

    if config.backend.timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout("backend.timeout_ms"));
    }
    if config.backend.connect_timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout("backend.connect_timeout_ms"));
    }
    if config.gateway.default_deadline_ms == 0 {
        errors.push(ValidationError::ZeroTimeout("gateway.default_deadline_ms"));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("listener.request_timeout_secs"));
    }

    if config.queue.redelivery_max_delay_ms < config.queue.redelivery_delay_ms {
        errors.push(ValidationError::DelayBounds {
            base: config.queue.redelivery_delay_ms,
            max: config.queue.redelivery_max_delay_ms,
        });
    }

    if config.admin.enabled && config.admin.api_key == ADMIN_KEY_PLACEHOLDER {
        errors.push(ValidationError::PlaceholderAdminKey);
    }

    if config.backend.denied_marker == config.backend.success_marker {
        errors.push(ValidationError::AmbiguousMarkers);
    }

    for status in &config.backend.transient_statuses {
        if config.backend.rejection_statuses.contains(status) {
            errors.push(ValidationError::ConflictingStatus(*status));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
