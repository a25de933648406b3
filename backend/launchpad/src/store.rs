//! # Storage capability
//!
//! The service never reads a counter and writes it back. Every mutation that
//! must stay consistent with another one is a single trait call, and the
//! implementation makes it atomic:
//!
//! | Call                    | Atomic unit                                             |
//! |-------------------------|---------------------------------------------------------|
//! | `record_contribution`   | contribution insert + `raised += amount, count += 1`    |
//! | `try_lock_distribution` | status check + conditional set of the project's lock     |
//! | `finalize_distribution` | mark contributions allocated + project completed + unlock |
//!
//! The distribution lock is owned: it records the token of the batch holding
//! it, and only that token can release it or complete the project.

use async_trait::async_trait;

use crate::amount::Usd;
use crate::errors::Result;
use crate::types::{Contribution, NewProject, Project, ProjectStatus, StatusTotals};

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Persist a new project in `upcoming` status and return its id.
    async fn insert_project(&self, project: &NewProject) -> Result<String>;

    /// Fails with `NotFound` when no project has this id.
    async fn get_project(&self, id: &str) -> Result<Project>;

    /// All projects, most recent `start_time` first.
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Move a project from `expected` to `status`.
    ///
    /// Fails with `Conflict` if the stored status is no longer `expected` or a
    /// distribution batch currently holds the project.
    async fn update_project_status(
        &self,
        id: &str,
        expected: ProjectStatus,
        status: ProjectStatus,
    ) -> Result<()>;

    /// Insert `contribution` and add `amount_delta` / `contributor_delta` to
    /// its project's aggregates. Either everything lands or nothing does.
    async fn record_contribution(
        &self,
        contribution: &Contribution,
        amount_delta: Usd,
        contributor_delta: i64,
    ) -> Result<()>;

    async fn list_pending_contributions(&self, project_id: &str) -> Result<Vec<Contribution>>;

    /// Every contribution of a project regardless of status, oldest first.
    async fn list_contributions(&self, project_id: &str) -> Result<Vec<Contribution>>;

    /// Take the project's distribution lock for `lock_token`. Returns `false`
    /// if another batch holds it or the project is neither `active` nor
    /// `completed`.
    async fn try_lock_distribution(&self, project_id: &str, lock_token: &str) -> Result<bool>;

    /// Release the lock if `lock_token` holds it; otherwise do nothing.
    async fn unlock_distribution(&self, project_id: &str, lock_token: &str) -> Result<()>;

    /// Mark exactly `contribution_ids` allocated under `distribution_tx_hash`,
    /// mark the project completed and release the lock held by `lock_token`.
    ///
    /// Fails with `Conflict` and changes nothing if any id is no longer
    /// pending, the lock is not held by `lock_token`, or the project is no
    /// longer distributable.
    async fn finalize_distribution(
        &self,
        project_id: &str,
        lock_token: &str,
        contribution_ids: &[String],
        distribution_tx_hash: &str,
    ) -> Result<()>;

    /// Sum of `amount` and `tokens_allocated` per status for one contributor,
    /// ordered by status name.
    async fn sum_contributions_by_status(
        &self,
        project_id: &str,
        user_address: &str,
    ) -> Result<Vec<StatusTotals>>;
}
