//! Shield-then-record contribution flow.
//!
//! A pledge is validated, shielded through the privacy pool, and only then
//! written to the ledger together with its project's aggregate update. When
//! the shield transfer does not confirm, nothing is persisted.
//!
//! Everything from submission onward runs in a spawned task, so a caller that
//! goes away mid-transfer cannot leave a confirmed shield unrecorded.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn};

use crate::allocation::tokens_allocated;
use crate::amount::{Tokens, Usd};
use crate::clock::Clock;
use crate::errors::{LaunchpadError, Result};
use crate::signer::{TransactionRequest, TransactionSigner};
use crate::store::ProjectStore;
use crate::types::{
    new_id, ContributeRequest, ContributeResponse, Contribution, ContributionStatus,
    ProjectStatus,
};

/// Everything checked and computed before any transfer is submitted.
struct Pledge {
    project_id: String,
    amount: Usd,
    tokens: Tokens,
    user_address: String,
    request: ContributeRequest,
}

pub struct ContributionProcessor {
    store: Arc<dyn ProjectStore>,
    clock: Arc<dyn Clock>,
    privacy_pool_address: String,
}

impl ContributionProcessor {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        clock: Arc<dyn Clock>,
        privacy_pool_address: impl Into<String>,
    ) -> Self {
        Self {
            store,
            clock,
            privacy_pool_address: privacy_pool_address.into(),
        }
    }

    /// Validate, shield and record one pledge.
    ///
    /// `timeout` bounds everything up to the shield submission. Once the
    /// transfer is submitted it is awaited to completion, even if the
    /// returned future is dropped.
    pub async fn contribute(
        &self,
        request: &ContributeRequest,
        signer: Arc<dyn TransactionSigner>,
        timeout: Duration,
    ) -> Result<ContributeResponse> {
        let deadline = Instant::now() + timeout;
        let pledge = timeout_at(deadline, self.prepare(request, signer.as_ref()))
            .await
            .map_err(|_| LaunchpadError::Timeout)??;

        let task = settle(
            self.store.clone(),
            signer,
            self.privacy_pool_address.clone(),
            pledge,
        );
        tokio::spawn(task).await?
    }

    async fn prepare(
        &self,
        request: &ContributeRequest,
        signer: &dyn TransactionSigner,
    ) -> Result<Pledge> {
        let project = self.store.get_project(&request.project_id).await?;

        if project.status != ProjectStatus::Active {
            return Err(LaunchpadError::validation("project is not active"));
        }
        if !project.in_contribution_period(self.clock.now()) {
            return Err(LaunchpadError::validation(
                "project is not in contribution period",
            ));
        }

        let amount: Usd = request.amount.parse()?;
        if amount.is_zero() {
            return Err(LaunchpadError::validation("contribution amount must be positive"));
        }
        if amount < project.min_contribution || amount > project.max_contribution {
            return Err(LaunchpadError::validation(
                "contribution amount out of allowed range",
            ));
        }

        // Computed up front so nothing can fail between the transfer and the write.
        let tokens = tokens_allocated(amount, project.price_per_token)?;
        let user_address = signer.address().await?;

        Ok(Pledge {
            project_id: project.id,
            amount,
            tokens,
            user_address,
            request: request.clone(),
        })
    }
}

/// Shield the pledge and record it. Runs detached from the caller.
async fn settle(
    store: Arc<dyn ProjectStore>,
    signer: Arc<dyn TransactionSigner>,
    privacy_pool_address: String,
    pledge: Pledge,
) -> Result<ContributeResponse> {
    let Pledge {
        project_id,
        amount,
        tokens,
        user_address,
        request,
    } = pledge;

    let shield = TransactionRequest {
        to: privacy_pool_address,
        value: Some(amount.units()),
        call: format!("shield({},{})", request.token.as_str(), request.amount),
    };
    let shield_tx_hash = match signer.send_and_confirm(shield).await? {
        Some(receipt) => receipt.tx_hash,
        None => {
            warn!("Shield transfer for project {project_id} by {user_address} did not confirm");
            return Err(LaunchpadError::transaction("shield transaction failed"));
        }
    };

    let contribution = Contribution {
        id: new_id(),
        project_id,
        user_address,
        destination_address: request.destination_address,
        amount,
        token: request.token,
        tokens_allocated: tokens,
        shield_tx_hash: shield_tx_hash.clone(),
        distribution_tx_hash: None,
        status: ContributionStatus::Pending,
        created_at: Utc::now(),
    };

    if let Err(e) = store
        .record_contribution(&contribution, contribution.amount, 1)
        .await
    {
        // Funds are already in the pool; the hash is the only trace left.
        error!(
            "Shielded {} {} for project {} in tx {} but failed to record it: {e}",
            contribution.amount,
            contribution.token.as_str(),
            contribution.project_id,
            shield_tx_hash
        );
        return Err(e);
    }

    info!(
        "Recorded contribution {} of {} {} to project {} ({} tokens)",
        contribution.id,
        contribution.amount,
        contribution.token.as_str(),
        contribution.project_id,
        contribution.tokens_allocated
    );

    Ok(ContributeResponse {
        shield_tx_hash,
        contribution_id: contribution.id,
    })
}
