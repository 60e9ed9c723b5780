use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::ledger::{
    Address,
    LogRecord,
};

/// Events the wager and token contracts emit, keyed by event name. Records
/// carrying any other shape fail to decode and are skipped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "args")]
pub enum LedgerEvent {
    SpinResult(SpinResultEvent),
    Approval(ApprovalEvent),
    TokensPurchased(TokensPurchasedEvent),
}

/// The settlement event: `sector_index` is the ledger's own enumeration of
/// the winning sector, not a visual position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinResultEvent {
    pub player: Address,
    pub sector_index: u32,
    pub multiplier: u64,
    pub payout: u128,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalEvent {
    pub owner: Address,
    pub spender: Address,
    pub amount: u128,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokensPurchasedEvent {
    pub buyer: Address,
    pub amount: u128,
}

impl LedgerEvent {
    pub fn into_record(self) -> LogRecord {
        LogRecord(serde_json::to_value(self).expect("ledger event serializes"))
    }
}

/// The settlement result extracted from a finalized wager transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub protocol_index: u32,
    pub multiplier: u64,
    pub payout: u128,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("finalized wager transaction carried no decodable SpinResult record")]
pub struct SettlementEventMissing;

/// Extracts the spin outcome from the records of a finalized transaction.
///
/// Records that do not decode against the known schema are skipped. A single
/// wager emits exactly one `SpinResult`, but if more than one is ever
/// present the first in record order wins.
pub fn correlate_spin_outcome(
    records: &[LogRecord],
) -> Result<Outcome, SettlementEventMissing> {
    for record in records {
        if let Some(LedgerEvent::SpinResult(event)) = record.decode::<LedgerEvent>() {
            return Ok(Outcome {
                protocol_index: event.sector_index,
                multiplier: event.multiplier,
                payout: event.payout,
            });
        }
    }
    Err(SettlementEventMissing)
}
