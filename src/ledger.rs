use std::{
    fmt,
    str::FromStr,
};

use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
    de::DeserializeOwned,
};
use thiserror::Error;

/// Base units per display token (18 decimals, matching the ledger's ERC-20).
pub const TOKEN_UNIT: u128 = 1_000_000_000_000_000_000;

/// Renders a base-unit amount as whole tokens with two decimals.
pub fn format_units(amount: u128) -> String {
    let whole = amount / TOKEN_UNIT;
    let cents = (amount % TOKEN_UNIT) / (TOKEN_UNIT / 100);
    format!("{whole}.{cents:02}")
}

/// 20-byte account or contract identifier, rendered as `0x`-prefixed hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid address {0:?}: expected 20 bytes of hex")]
pub struct AddressParseError(String);

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes =
            hex::decode(raw).map_err(|_| AddressParseError(s.to_string()))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| AddressParseError(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One opaque record attached to a finalized transaction. Consumers decode
/// records against the schemas they know and skip the rest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord(pub serde_json::Value);

impl LogRecord {
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.0.clone()).ok()
    }
}

/// A finalized transaction together with its emitted records, in emission
/// order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub records: Vec<LogRecord>,
}

/// Failure of a read-only ledger query. Never fatal: callers retain their
/// last-known state and retry on the next scheduled refresh.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("ledger query failed: {0}")]
    Fetch(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// The wallet declined to sign or the transaction reverted on the ledger.
    #[error("transaction rejected: {0}")]
    Rejected(String),
    /// The submission never reached finalization on the transport.
    #[error("ledger submission failed: {0}")]
    Network(String),
}

/// Read-only ledger surface.
pub trait LedgerQuery {
    fn allowance(
        &self,
        owner: Address,
        spender: Address,
    ) -> impl Future<Output = Result<u128, QueryError>>;

    fn balance_of(
        &self,
        owner: Address,
    ) -> impl Future<Output = Result<u128, QueryError>>;
}

/// State-changing ledger surface. Each call submits a transaction and awaits
/// its finalization; there is no separate confirmation step.
pub trait LedgerSubmit {
    fn spin(
        &self,
        bet_amount: u128,
    ) -> impl Future<Output = Result<TxReceipt, SubmitError>>;

    fn approve(
        &self,
        spender: Address,
        amount: u128,
    ) -> impl Future<Output = Result<TxReceipt, SubmitError>>;

    fn buy_tokens(
        &self,
        count: u64,
    ) -> impl Future<Output = Result<TxReceipt, SubmitError>>;
}
