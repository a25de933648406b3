//! # Launchpad
//!
//! Façade over the storage capability and the two write flows. This is the
//! surface the REST layer talks to:
//!
//! | Phase        | Operation(s)                                   |
//! |--------------|------------------------------------------------|
//! | Registration | [`Launchpad::create_project`]                  |
//! | Admin        | [`Launchpad::update_project_status`]           |
//! | Funding      | [`Launchpad::contribute`]                      |
//! | Settlement   | [`Launchpad::distribute`]                      |
//! | Queries      | `get_project`, `list_projects`, `contribution_status` |
//! | Audit        | [`Launchpad::audit_project`]                   |
//!
//! Configuration is fixed at construction. The struct holds no mutable state
//! and is shared behind an `Arc` across request handlers.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::allocation::tokens_allocated;
use crate::amount::Usd;
use crate::clock::Clock;
use crate::contribution::ContributionProcessor;
use crate::distribution::DistributionBatcher;
use crate::errors::{LaunchpadError, Result};
use crate::signer::TransactionSigner;
use crate::store::ProjectStore;
use crate::types::{
    ContributeRequest, ContributeResponse, ContributionSummary, DistributeResponse, NewProject,
    Project, ProjectAudit, ProjectStatus,
};

/// Construction-time settings.
#[derive(Debug, Clone)]
pub struct LaunchpadSettings {
    pub privacy_pool_address: String,
    /// Deadline applied when a caller does not supply one.
    pub default_timeout: Duration,
}

pub struct Launchpad {
    store: Arc<dyn ProjectStore>,
    contributions: ContributionProcessor,
    distributions: DistributionBatcher,
    default_timeout: Duration,
}

impl Launchpad {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        clock: Arc<dyn Clock>,
        settings: LaunchpadSettings,
    ) -> Self {
        Self {
            contributions: ContributionProcessor::new(
                store.clone(),
                clock,
                settings.privacy_pool_address.clone(),
            ),
            distributions: DistributionBatcher::new(
                store.clone(),
                settings.privacy_pool_address,
            ),
            store,
            default_timeout: settings.default_timeout,
        }
    }

    pub async fn create_project(&self, project: &NewProject) -> Result<Project> {
        project.validate()?;
        let id = self.store.insert_project(project).await?;
        info!("Registered project {id} ({})", project.symbol);
        self.store.get_project(&id).await
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        self.store.list_projects().await
    }

    pub async fn get_project(&self, id: &str) -> Result<Project> {
        self.store.get_project(id).await
    }

    /// Administrative status change. `completed` is reserved for
    /// [`Launchpad::distribute`].
    pub async fn update_project_status(&self, id: &str, status: ProjectStatus) -> Result<Project> {
        let project = self.store.get_project(id).await?;
        if !project.status.admin_can_transition_to(status) {
            return Err(LaunchpadError::validation(format!(
                "cannot move project from {} to {}",
                project.status, status
            )));
        }
        self.store
            .update_project_status(id, project.status, status)
            .await?;
        info!("Project {id} moved from {} to {status}", project.status);
        self.store.get_project(id).await
    }

    pub async fn contribute(
        &self,
        request: &ContributeRequest,
        signer: Arc<dyn TransactionSigner>,
        timeout: Option<Duration>,
    ) -> Result<ContributeResponse> {
        self.contributions
            .contribute(request, signer, timeout.unwrap_or(self.default_timeout))
            .await
    }

    pub async fn distribute(
        &self,
        project_id: &str,
        signer: Arc<dyn TransactionSigner>,
        timeout: Option<Duration>,
    ) -> Result<DistributeResponse> {
        self.distributions
            .distribute(project_id, signer, timeout.unwrap_or(self.default_timeout))
            .await
    }

    /// Totals of `user_address`'s contributions to `project_id`.
    ///
    /// Reports the first status group; a contributor with no contributions
    /// gets the zero-valued pending summary.
    pub async fn contribution_status(
        &self,
        project_id: &str,
        user_address: &str,
    ) -> Result<ContributionSummary> {
        let totals = self
            .store
            .sum_contributions_by_status(project_id, user_address)
            .await?;

        Ok(totals
            .into_iter()
            .next()
            .map(|group| ContributionSummary {
                contributed: group.amount,
                tokens_allocated: group.tokens_allocated,
                status: group.status,
            })
            .unwrap_or_default())
    }

    /// Recompute a project's aggregates and allocations from its
    /// contribution records and compare them with what is stored.
    pub async fn audit_project(&self, project_id: &str) -> Result<ProjectAudit> {
        let project = self.store.get_project(project_id).await?;
        let contributions = self.store.list_contributions(project_id).await?;

        let mut recorded_amount = Usd::ZERO;
        let mut mismatched_allocations = Vec::new();
        for c in &contributions {
            recorded_amount = recorded_amount
                .checked_add(c.amount)
                .ok_or_else(|| LaunchpadError::validation("contribution totals overflow"))?;
            if tokens_allocated(c.amount, project.price_per_token)? != c.tokens_allocated {
                mismatched_allocations.push(c.id.clone());
            }
        }
        let recorded_contributions = contributions.len() as i64;

        let consistent = recorded_amount == project.raised_amount
            && recorded_contributions == project.contributors_count
            && mismatched_allocations.is_empty();
        if !consistent {
            warn!("Audit of project {project_id} found inconsistencies");
        }

        Ok(ProjectAudit {
            project_id: project.id,
            raised_amount: project.raised_amount,
            recorded_amount,
            contributors_count: project.contributors_count,
            recorded_contributions,
            mismatched_allocations,
            consistent,
        })
    }
}
