//! Client for the tx-mediator HTTP facade.

pub mod client;

pub use client::{MediatorClient, RequestOutcome};
