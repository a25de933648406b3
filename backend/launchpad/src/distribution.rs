//! All-or-nothing distribution batch.
//!
//! One aggregate transaction authorizes the whole batch; per-recipient payout
//! is the token contract's business. The ledger side either moves every
//! fetched contribution to `allocated` and the project to `completed`, or
//! changes nothing.
//!
//! Batches are serialized per project through the storage-level distribution
//! lock, taken under a fresh token per batch. From the lock attempt onward the
//! batch runs in a spawned task, and every exit path after that releases the
//! lock, so a dropped caller cannot strand it.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn};

use crate::amount::Tokens;
use crate::errors::{LaunchpadError, Result};
use crate::signer::{TransactionRequest, TransactionSigner};
use crate::store::ProjectStore;
use crate::types::{new_id, Contribution, DistributeResponse, Project, ProjectStatus};

pub struct DistributionBatcher {
    store: Arc<dyn ProjectStore>,
    privacy_pool_address: String,
}

impl DistributionBatcher {
    pub fn new(store: Arc<dyn ProjectStore>, privacy_pool_address: impl Into<String>) -> Self {
        Self {
            store,
            privacy_pool_address: privacy_pool_address.into(),
        }
    }

    /// Distribute every pending contribution of `project_id` in one batch.
    ///
    /// `timeout` bounds everything up to the distribution submission,
    /// including taking the lock.
    pub async fn distribute(
        &self,
        project_id: &str,
        signer: Arc<dyn TransactionSigner>,
        timeout: Duration,
    ) -> Result<DistributeResponse> {
        let deadline = Instant::now() + timeout;

        let project = timeout_at(deadline, load_distributable(self.store.as_ref(), project_id))
            .await
            .map_err(|_| LaunchpadError::Timeout)??;

        let target = project
            .token_address
            .clone()
            .unwrap_or_else(|| self.privacy_pool_address.clone());
        let batch = Batch {
            store: self.store.clone(),
            project_id: project.id,
            target,
            lock_token: new_id(),
            deadline,
        };
        tokio::spawn(batch.run(signer)).await?
    }
}

async fn load_distributable(store: &dyn ProjectStore, project_id: &str) -> Result<Project> {
    let project = store.get_project(project_id).await?;
    match project.status {
        ProjectStatus::Active | ProjectStatus::Completed => Ok(project),
        ProjectStatus::Upcoming | ProjectStatus::Cancelled => Err(LaunchpadError::validation(
            "project is not ready for distribution",
        )),
    }
}

/// One distribution attempt, owned by its spawned task.
struct Batch {
    store: Arc<dyn ProjectStore>,
    project_id: String,
    /// Recipient of the aggregate distribution call.
    target: String,
    lock_token: String,
    deadline: Instant,
}

impl Batch {
    async fn run(self, signer: Arc<dyn TransactionSigner>) -> Result<DistributeResponse> {
        let locked = match timeout_at(
            self.deadline,
            self.store
                .try_lock_distribution(&self.project_id, &self.lock_token),
        )
        .await
        {
            Ok(locked) => locked?,
            Err(_) => {
                // The lock write may have landed after all.
                self.release().await;
                return Err(LaunchpadError::Timeout);
            }
        };

        if !locked {
            // Either another batch holds the lock or the project left the
            // distributable statuses since it was loaded.
            load_distributable(self.store.as_ref(), &self.project_id).await?;
            return Err(LaunchpadError::conflict("distribution already in progress"));
        }

        let result = self.run_locked(signer.as_ref()).await;
        if result.is_err() {
            self.release().await;
        }
        result
    }

    /// Runs with the distribution lock held. On success the lock is released
    /// by `finalize_distribution`; on error the caller releases it.
    async fn run_locked(&self, signer: &dyn TransactionSigner) -> Result<DistributeResponse> {
        let pending = timeout_at(
            self.deadline,
            self.store.list_pending_contributions(&self.project_id),
        )
        .await
        .map_err(|_| LaunchpadError::Timeout)??;

        if pending.is_empty() {
            return Err(LaunchpadError::conflict(
                "no pending contributions to distribute",
            ));
        }

        let request = TransactionRequest {
            to: self.target.clone(),
            value: None,
            call: "distributeTokens()".to_string(),
        };
        let distribution_tx_hash = match signer.send_and_confirm(request).await? {
            Some(receipt) => receipt.tx_hash,
            None => {
                warn!("Distribution for project {} did not confirm", self.project_id);
                return Err(LaunchpadError::transaction(
                    "distribution transaction failed",
                ));
            }
        };

        let ids: Vec<String> = pending.iter().map(|c| c.id.clone()).collect();
        if let Err(e) = self
            .store
            .finalize_distribution(&self.project_id, &self.lock_token, &ids, &distribution_tx_hash)
            .await
        {
            error!(
                "Distribution tx {distribution_tx_hash} confirmed for project {} but the ledger was not updated: {e}",
                self.project_id
            );
            return Err(e);
        }

        info!(
            "Distributed project {} to {} contributions in tx {distribution_tx_hash} ({} tokens)",
            self.project_id,
            pending.len(),
            batch_tokens(&pending)
        );

        Ok(DistributeResponse {
            distribution_tx_hash,
        })
    }

    async fn release(&self) {
        if let Err(e) = self
            .store
            .unlock_distribution(&self.project_id, &self.lock_token)
            .await
        {
            error!(
                "Failed to release distribution lock for project {}: {e}",
                self.project_id
            );
        }
    }
}

/// Total tokens owed across a batch, for logging.
fn batch_tokens(batch: &[Contribution]) -> String {
    batch
        .iter()
        .try_fold(Tokens::ZERO, |acc, c| acc.checked_add(c.tokens_allocated))
        .map(|total| total.to_string())
        .unwrap_or_else(|| "overflowing".to_string())
}
