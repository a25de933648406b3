//! JSON-RPC [`TransactionSigner`] for node-managed accounts.
//!
//! Submits with `eth_sendTransaction` (the node holds the key for `from`) and
//! then polls `eth_getTransactionReceipt`.
//!
//! ## Confirmation
//!
//! * A receipt with status `0x1` (or no status field) is a confirmation.
//! * A receipt with status `0x0` is a revert and reported as no receipt.
//! * If no receipt shows up within the confirmation window the transaction is
//!   reported as unconfirmed. Poll errors inside the window are logged and
//!   polling continues.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::signer::{Receipt, TransactionRequest, TransactionSigner};

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawReceipt {
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    pub status: Option<String>,
}

impl RawReceipt {
    fn succeeded(&self) -> bool {
        !matches!(self.status.as_deref(), Some("0x0"))
    }
}

enum Outcome<T> {
    Reply(Option<T>),
    Rejected(RpcError),
}

// ─────────────────────────────────────────────────────────
// Signer
// ─────────────────────────────────────────────────────────

pub struct RpcSigner {
    client: Client,
    rpc_url: String,
    from: String,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl RpcSigner {
    pub fn new(
        client: Client,
        rpc_url: impl Into<String>,
        from: impl Into<String>,
        confirmation_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            rpc_url: rpc_url.into(),
            from: from.into(),
            confirmation_timeout,
            poll_interval,
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Outcome<T>> {
        let body: RpcResponse<T> = self
            .client
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }))
            .send()
            .await?
            .json()
            .await?;

        match body.error {
            Some(err) => Ok(Outcome::Rejected(err)),
            None => Ok(Outcome::Reply(body.result)),
        }
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Option<RawReceipt> {
        let deadline = Instant::now() + self.confirmation_timeout;
        loop {
            match self
                .call::<RawReceipt>("eth_getTransactionReceipt", json!([tx_hash]))
                .await
            {
                Ok(Outcome::Reply(Some(receipt))) => return Some(receipt),
                Ok(Outcome::Reply(None)) => debug!("Transaction {tx_hash} not yet mined"),
                Ok(Outcome::Rejected(err)) => {
                    warn!("Receipt poll for {tx_hash} rejected: {} {}", err.code, err.message)
                }
                Err(e) => warn!("Receipt poll for {tx_hash} failed: {e}"),
            }

            if Instant::now() + self.poll_interval > deadline {
                return None;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl TransactionSigner for RpcSigner {
    async fn address(&self) -> Result<String> {
        Ok(self.from.clone())
    }

    async fn send_and_confirm(&self, request: TransactionRequest) -> Result<Option<Receipt>> {
        let params = build_params(&self.from, &request);
        let tx_hash = match self.call::<String>("eth_sendTransaction", params).await? {
            Outcome::Reply(Some(hash)) => hash,
            Outcome::Reply(None) => {
                warn!("eth_sendTransaction returned no hash for call {}", request.call);
                return Ok(None);
            }
            Outcome::Rejected(err) => {
                warn!(
                    "eth_sendTransaction rejected ({}): {} {}",
                    request.call, err.code, err.message
                );
                return Ok(None);
            }
        };
        debug!("Submitted {} as {tx_hash}", request.call);

        match self.wait_for_receipt(&tx_hash).await {
            Some(receipt) if receipt.succeeded() => Ok(Some(Receipt {
                tx_hash: receipt.transaction_hash,
            })),
            Some(_) => {
                warn!("Transaction {tx_hash} reverted");
                Ok(None)
            }
            None => {
                warn!(
                    "Transaction {tx_hash} unconfirmed after {}s",
                    self.confirmation_timeout.as_secs()
                );
                Ok(None)
            }
        }
    }
}

fn build_params(from: &str, request: &TransactionRequest) -> Value {
    let mut tx = json!({
        "from": from,
        "to": request.to,
        "data": format!("0x{}", hex::encode(request.call.as_bytes())),
    });
    if let Some(value) = request.value {
        tx["value"] = json!(format!("0x{value:x}"));
    }
    json!([tx])
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
