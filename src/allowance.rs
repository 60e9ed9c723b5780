use thiserror::Error;
use tracing::warn;

use crate::ledger::{
    Address,
    LedgerQuery,
    LedgerSubmit,
    SubmitError,
};

/// Effectively unbounded grant, requested once so the player is not prompted
/// to approve before every wager. Half of the range keeps additive ledger
/// implementations clear of overflow.
pub const UNLIMITED_ALLOWANCE: u128 = u128::MAX / 2;

/// Snapshot of the spending permission the wager contract holds. Only a
/// confirmed ledger query mutates `granted`; nothing here is assumed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllowanceState {
    pub granted: u128,
    pub required: u128,
}

impl AllowanceState {
    pub fn is_sufficient(&self) -> bool {
        self.granted >= self.required
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("approval transaction rejected: {0}")]
    Rejected(String),
    #[error("approval finalized but the re-queried allowance is still below the threshold")]
    NotConfirmed,
}

pub struct AllowanceManager {
    owner: Address,
    spender: Address,
    state: AllowanceState,
}

impl AllowanceManager {
    pub fn new(owner: Address, spender: Address, required: u128) -> Self {
        Self {
            owner,
            spender,
            state: AllowanceState {
                granted: 0,
                required,
            },
        }
    }

    pub fn state(&self) -> AllowanceState {
        self.state
    }

    /// Re-reads the granted allowance from the ledger. Fails closed: an
    /// unreadable allowance never unlocks wagering.
    pub async fn check(&mut self, query: &impl LedgerQuery) -> AllowanceState {
        match query.allowance(self.owner, self.spender).await {
            Ok(granted) => self.state.granted = granted,
            Err(err) => {
                warn!(%err, "allowance query failed, treating as insufficient");
                self.state.granted = 0;
            }
        }
        self.state
    }

    /// Submits an unbounded approval and waits for finalization. Submission
    /// success alone proves nothing; only the follow-up `check` may mark the
    /// allowance sufficient.
    pub async fn request_approval(
        &mut self,
        submit: &impl LedgerSubmit,
        query: &impl LedgerQuery,
    ) -> Result<AllowanceState, ApprovalError> {
        if let Err(err) = submit.approve(self.spender, UNLIMITED_ALLOWANCE).await {
            let reason = match err {
                SubmitError::Rejected(reason) => reason,
                SubmitError::Network(reason) => reason,
            };
            return Err(ApprovalError::Rejected(reason));
        }

        let state = self.check(query).await;
        if state.is_sufficient() {
            Ok(state)
        } else {
            Err(ApprovalError::NotConfirmed)
        }
    }
}
