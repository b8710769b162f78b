//! Time budget enforcement for outbound calls.
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Budget expiry is reported separately from the call's own errors

use std::future::Future;
use std::time::Duration;

/// The call did not finish within its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetExceeded(pub Duration);

/// Run `fut` with an upper bound of `budget`.
pub async fn with_budget<F, T>(budget: Duration, fut: F) -> Result<T, BudgetExceeded>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(budget, fut)
        .await
        .map_err(|_| BudgetExceeded(budget))
}
