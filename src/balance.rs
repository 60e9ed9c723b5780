use tracing::warn;

use crate::ledger::{
    Address,
    LedgerQuery,
    QueryError,
};

/// Locally cached token balance, eventually consistent with the ledger.
///
/// The cache is replaced only by a successful query; a failed refresh keeps
/// whatever was last known rather than blanking the display. Refreshes carry
/// no side effects of their own, so under concurrent calls the last response
/// to arrive simply wins.
pub struct BalanceTracker {
    owner: Address,
    cached: Option<u128>,
}

impl BalanceTracker {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            cached: None,
        }
    }

    /// Last successfully fetched balance, if any.
    pub fn current(&self) -> Option<u128> {
        self.cached
    }

    pub async fn refresh(
        &mut self,
        query: &impl LedgerQuery,
    ) -> Result<u128, QueryError> {
        match query.balance_of(self.owner).await {
            Ok(balance) => {
                self.cached = Some(balance);
                Ok(balance)
            }
            Err(err) => {
                warn!(%err, "balance query failed, keeping last-known value");
                Err(err)
            }
        }
    }
}
