//! Transaction submission capability.
//!
//! The launchpad never signs or broadcasts anything itself. It hands a
//! [`TransactionRequest`] to a [`TransactionSigner`] and waits for the
//! outcome. `Ok(None)` means the transaction did not confirm; callers treat
//! the whole enclosing operation as failed.

use async_trait::async_trait;

use crate::errors::Result;

/// A transfer or contract call to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub to: String,
    /// Native value in currency base units, if any.
    pub value: Option<u128>,
    /// Human-readable call descriptor, e.g. `shield(USDT,1000)`.
    pub call: String,
}

/// Proof that a submitted transaction confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: String,
}

#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Public address transactions are sent from.
    async fn address(&self) -> Result<String>;

    /// Submit `request` and wait for it to confirm.
    ///
    /// May block for a long time. Must not be cancelled once called.
    async fn send_and_confirm(&self, request: TransactionRequest) -> Result<Option<Receipt>>;
}
