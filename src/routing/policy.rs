//! Redelivery policy.
//!
//! Unbounded by default: a transient backend failure is redelivered until it
//! succeeds. Callers are protected by their own deadline, not by a cap here.

use std::time::Duration;

use crate::config::QueueConfig;
use crate::resilience::backoff::redelivery_delay;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeliveryPolicy {
    /// `None` redelivers forever.
    pub max_redeliveries: Option<u32>,
    pub delay: Duration,
    pub max_delay: Duration,
    pub exponential: bool,
}

impl RedeliveryPolicy {
    /// Retry forever with a fixed delay.
    pub fn unbounded(delay: Duration) -> Self {
        Self {
            max_redeliveries: None,
            delay,
            max_delay: delay,
            exponential: false,
        }
    }

    pub fn with_max_redeliveries(mut self, max: u32) -> Self {
        self.max_redeliveries = Some(max);
        self
    }

    /// Delay before redelivery number `redelivery` (1-based).
    pub fn delay_for(&self, redelivery: u32) -> Duration {
        redelivery_delay(
            redelivery,
            self.delay.as_millis() as u64,
            self.max_delay.as_millis() as u64,
            self.exponential,
        )
    }
}

impl Default for RedeliveryPolicy {
    fn default() -> Self {
        Self::from(&QueueConfig::default())
    }
}

impl From<&QueueConfig> for RedeliveryPolicy {
    fn from(config: &QueueConfig) -> Self {
        Self {
            max_redeliveries: config.max_redeliveries,
            delay: Duration::from_millis(config.redelivery_delay_ms),
            max_delay: Duration::from_millis(config.redelivery_max_delay_ms),
            exponential: config.redelivery_backoff,
        }
    }
}
