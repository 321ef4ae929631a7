//! Balance checks and payment settlement.

use thiserror::Error;

use crate::request::RequesterId;

#[derive(Debug, Error)]
pub enum CostError {
    /// No economy backend is reachable. Relocations proceed uncharged.
    #[error("cost provider unavailable: {0}")]
    Unavailable(String),
    #[error("payment of {amount} by {requester} failed: {reason}")]
    Settlement {
        requester: RequesterId,
        amount: f64,
        reason: String,
    },
}

/// Economy backend charged for relocations.
pub trait CostProvider: Send + Sync + 'static {
    fn has_sufficient_balance(&self, requester: RequesterId, amount: f64)
    -> Result<bool, CostError>;

    /// Called once, after the move succeeded.
    fn settle(&self, requester: RequesterId, amount: f64) -> Result<(), CostError>;
}

impl<P: CostProvider + ?Sized> CostProvider for std::sync::Arc<P> {
    fn has_sufficient_balance(
        &self,
        requester: RequesterId,
        amount: f64,
    ) -> Result<bool, CostError> {
        (**self).has_sufficient_balance(requester, amount)
    }

    fn settle(&self, requester: RequesterId, amount: f64) -> Result<(), CostError> {
        (**self).settle(requester, amount)
    }
}
