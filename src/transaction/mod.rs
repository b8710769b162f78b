//! Transactional processing of deliveries.

pub mod controller;
pub mod observer;

pub use controller::{TransactionController, UnitOutcome};
pub use observer::DeliveryObserver;
