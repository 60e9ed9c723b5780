use std::{
    collections::{
        HashMap,
        VecDeque,
    },
    sync::Mutex,
};

use rand::{
    Rng,
    SeedableRng,
    rngs::StdRng,
};

use crate::{
    events::{
        ApprovalEvent,
        LedgerEvent,
        SpinResultEvent,
        TokensPurchasedEvent,
    },
    ledger::{
        Address,
        LedgerQuery,
        LedgerSubmit,
        QueryError,
        SubmitError,
        TOKEN_UNIT,
        TxReceipt,
    },
    wheel::PrizeClass,
};

/// In-process stand-in for the wager and token contracts.
///
/// Spins settle instantly against the same multiplier table the real ledger
/// enumerates, so receipts carry a genuine `SpinResult` record. Outcomes can
/// be scripted ahead of time for tests; otherwise they come from a seeded
/// generator. Query failures and submission rejections can be injected to
/// exercise the degraded paths.
pub struct FakeLedger {
    player: Address,
    wheel_contract: Address,
    state: Mutex<FakeState>,
}

struct FakeState {
    balances: HashMap<Address, u128>,
    allowances: HashMap<(Address, Address), u128>,
    multipliers: Vec<u64>,
    scripted: VecDeque<u32>,
    rng: StdRng,
    fail_queries: bool,
    reject_submissions: bool,
    next_tx: u64,
}

impl FakeLedger {
    pub fn new(player: Address, wheel_contract: Address, table: &[PrizeClass]) -> Self {
        let multipliers = table
            .iter()
            .flat_map(|class| std::iter::repeat_n(class.multiplier, class.weight as usize))
            .collect();
        Self {
            player,
            wheel_contract,
            state: Mutex::new(FakeState {
                balances: HashMap::new(),
                allowances: HashMap::new(),
                multipliers,
                scripted: VecDeque::new(),
                rng: StdRng::seed_from_u64(0x5eed),
                fail_queries: false,
                reject_submissions: false,
                next_tx: 0,
            }),
        }
    }

    pub fn with_balance(self, amount: u128) -> Self {
        self.credit(self.player, amount);
        self
    }

    pub fn credit(&self, owner: Address, amount: u128) {
        let mut state = self.lock();
        *state.balances.entry(owner).or_default() += amount;
    }

    /// Queues sector indices to be returned by upcoming spins, ahead of the
    /// seeded generator.
    pub fn script_outcomes(&self, indices: impl IntoIterator<Item = u32>) {
        self.lock().scripted.extend(indices);
    }

    pub fn set_fail_queries(&self, fail: bool) {
        self.lock().fail_queries = fail;
    }

    pub fn set_reject_submissions(&self, reject: bool) {
        self.lock().reject_submissions = reject;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake ledger lock poisoned")
    }

    fn receipt(state: &mut FakeState, records: Vec<LedgerEvent>) -> TxReceipt {
        state.next_tx += 1;
        TxReceipt {
            tx_hash: format!("0x{:064x}", state.next_tx),
            records: records.into_iter().map(LedgerEvent::into_record).collect(),
        }
    }
}

impl LedgerQuery for FakeLedger {
    async fn allowance(
        &self,
        owner: Address,
        spender: Address,
    ) -> Result<u128, QueryError> {
        let state = self.lock();
        if state.fail_queries {
            return Err(QueryError::Fetch(String::from("injected query failure")));
        }
        Ok(state
            .allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or(0))
    }

    async fn balance_of(&self, owner: Address) -> Result<u128, QueryError> {
        let state = self.lock();
        if state.fail_queries {
            return Err(QueryError::Fetch(String::from("injected query failure")));
        }
        Ok(state.balances.get(&owner).copied().unwrap_or(0))
    }
}

impl LedgerSubmit for FakeLedger {
    async fn spin(&self, bet_amount: u128) -> Result<TxReceipt, SubmitError> {
        let mut state = self.lock();
        if state.reject_submissions {
            return Err(SubmitError::Rejected(String::from(
                "injected submission rejection",
            )));
        }
        if state.multipliers.is_empty() {
            return Err(SubmitError::Rejected(String::from("wheel not initialized")));
        }

        let key = (self.player, self.wheel_contract);
        let granted = state.allowances.get(&key).copied().unwrap_or(0);
        if granted < bet_amount {
            return Err(SubmitError::Rejected(String::from("allowance exceeded")));
        }
        let balance = state.balances.get(&self.player).copied().unwrap_or(0);
        if balance < bet_amount {
            return Err(SubmitError::Rejected(String::from("insufficient balance")));
        }

        state.allowances.insert(key, granted - bet_amount);
        state.balances.insert(self.player, balance - bet_amount);

        let sector_count = state.multipliers.len() as u32;
        let sector_index = match state.scripted.pop_front() {
            Some(index) => index,
            None => state.rng.random_range(0..sector_count),
        };
        let multiplier = state
            .multipliers
            .get(sector_index as usize)
            .copied()
            .unwrap_or(0);
        let payout = bet_amount.saturating_mul(u128::from(multiplier));
        *state.balances.entry(self.player).or_default() += payout;

        let event = LedgerEvent::SpinResult(SpinResultEvent {
            player: self.player,
            sector_index,
            multiplier,
            payout,
        });
        Ok(Self::receipt(&mut state, vec![event]))
    }

    async fn approve(
        &self,
        spender: Address,
        amount: u128,
    ) -> Result<TxReceipt, SubmitError> {
        let mut state = self.lock();
        if state.reject_submissions {
            return Err(SubmitError::Rejected(String::from(
                "injected submission rejection",
            )));
        }
        state.allowances.insert((self.player, spender), amount);
        let event = LedgerEvent::Approval(ApprovalEvent {
            owner: self.player,
            spender,
            amount,
        });
        Ok(Self::receipt(&mut state, vec![event]))
    }

    async fn buy_tokens(&self, count: u64) -> Result<TxReceipt, SubmitError> {
        let mut state = self.lock();
        if state.reject_submissions {
            return Err(SubmitError::Rejected(String::from(
                "injected submission rejection",
            )));
        }
        let amount = u128::from(count) * TOKEN_UNIT;
        *state.balances.entry(self.player).or_default() += amount;
        let event = LedgerEvent::TokensPurchased(TokensPurchasedEvent {
            buyer: self.player,
            amount,
        });
        Ok(Self::receipt(&mut state, vec![event]))
    }
}
