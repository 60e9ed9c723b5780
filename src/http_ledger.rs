use color_eyre::eyre::{
    Result,
    WrapErr,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::ledger::{
    Address,
    LedgerQuery,
    LedgerSubmit,
    LogRecord,
    QueryError,
    SubmitError,
    TxReceipt,
};

/// Ledger client speaking JSON over HTTP to a signing gateway that exposes
/// the token and wager contract surface. The gateway holds the player's key;
/// this client never sees signatures, only finalized receipts.
#[derive(Clone)]
pub struct HttpLedger {
    base_url: String,
    http: reqwest::Client,
}

impl HttpLedger {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .build()
            .wrap_err("failed to build HTTP client for the ledger gateway")?;
        Ok(Self { base_url, http })
    }

    async fn get_amount(&self, url: String) -> Result<u128, QueryError> {
        let res = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| QueryError::Fetch(err.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            return Err(QueryError::Fetch(format!(
                "gateway responded with {status} for {url}"
            )));
        }
        let dto: AmountDto = res
            .json()
            .await
            .map_err(|err| QueryError::Fetch(err.to_string()))?;
        Ok(dto.amount)
    }

    async fn post_tx<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<TxReceipt, SubmitError> {
        let url = format!("{}/{path}", self.base_url);
        let res = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|err| SubmitError::Network(err.to_string()))?;
        let status = res.status();
        if status.is_client_error() {
            // The gateway reports declined signing and reverts as 4xx.
            let body = res
                .text()
                .await
                .unwrap_or_else(|_| String::from("<unavailable body>"));
            return Err(SubmitError::Rejected(body));
        }
        if !status.is_success() {
            return Err(SubmitError::Network(format!(
                "gateway responded with {status} for {url}"
            )));
        }
        let dto: TxReceiptDto = res
            .json()
            .await
            .map_err(|err| SubmitError::Network(err.to_string()))?;
        Ok(dto.into())
    }
}

impl LedgerQuery for HttpLedger {
    async fn allowance(
        &self,
        owner: Address,
        spender: Address,
    ) -> Result<u128, QueryError> {
        self.get_amount(format!("{}/allowance/{owner}/{spender}", self.base_url))
            .await
    }

    async fn balance_of(&self, owner: Address) -> Result<u128, QueryError> {
        self.get_amount(format!("{}/balance/{owner}", self.base_url))
            .await
    }
}

impl LedgerSubmit for HttpLedger {
    async fn spin(&self, bet_amount: u128) -> Result<TxReceipt, SubmitError> {
        self.post_tx("spin", &SpinBody { bet_amount }).await
    }

    async fn approve(
        &self,
        spender: Address,
        amount: u128,
    ) -> Result<TxReceipt, SubmitError> {
        self.post_tx("approve", &ApproveBody { spender, amount })
            .await
    }

    async fn buy_tokens(&self, count: u64) -> Result<TxReceipt, SubmitError> {
        self.post_tx("buy", &BuyBody { count }).await
    }
}

#[derive(Deserialize)]
struct AmountDto {
    amount: u128,
}

#[derive(Serialize)]
struct SpinBody {
    bet_amount: u128,
}

#[derive(Serialize)]
struct ApproveBody {
    spender: Address,
    amount: u128,
}

#[derive(Serialize)]
struct BuyBody {
    count: u64,
}

#[derive(Deserialize)]
struct TxReceiptDto {
    tx_hash: String,
    records: Vec<serde_json::Value>,
}

impl From<TxReceiptDto> for TxReceipt {
    fn from(dto: TxReceiptDto) -> Self {
        TxReceipt {
            tx_hash: dto.tx_hash,
            records: dto.records.into_iter().map(LogRecord).collect(),
        }
    }
}
