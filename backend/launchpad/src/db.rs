//! Database layer — migrations, queries, and the SQLite [`ProjectStore`].

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions,
};
use sqlx::SqlitePool;
use tracing::info;

use crate::amount::{Tokens, Usd};
use crate::errors::{LaunchpadError, Result};
use crate::store::ProjectStore;
use crate::types::{
    new_id, Contribution, ContributionStatus, NewProject, Project, ProjectStatus, StatusTotals,
};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };
    // Make sure the file is created if it doesn't exist yet.
    let options = SqliteConnectOptions::from_str(&url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

/// Apply the embedded migrations under `migrations/`.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied successfully");
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Row shapes and conversions
// ─────────────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: String,
    name: String,
    symbol: String,
    description: Option<String>,
    token_address: Option<String>,
    price_per_token: i64,
    total_supply: String,
    allocation: String,
    start_time: i64,
    end_time: i64,
    min_contribution: i64,
    max_contribution: i64,
    status: String,
    raised_amount: i64,
    contributors_count: i64,
    privacy_pool_address: String,
    created_at: i64,
    updated_at: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ContributionRow {
    id: String,
    project_id: String,
    user_address: String,
    destination_address: Option<String>,
    amount: i64,
    token: String,
    tokens_allocated: String,
    shield_tx_hash: String,
    distribution_tx_hash: Option<String>,
    status: String,
    created_at: i64,
}

const PROJECT_COLUMNS: &str = r#"
    id, name, symbol, description, token_address, price_per_token, total_supply,
    allocation, start_time, end_time, min_contribution, max_contribution, status,
    raised_amount, contributors_count, privacy_pool_address, created_at, updated_at
"#;

const CONTRIBUTION_COLUMNS: &str = r#"
    id, project_id, user_address, destination_address, amount, token,
    tokens_allocated, shield_tx_hash, distribution_tx_hash, status, created_at
"#;

fn corrupt(column: &str) -> LaunchpadError {
    LaunchpadError::Database(sqlx::Error::Decode(
        format!("corrupt value in column `{column}`").into(),
    ))
}

fn usd_from_db(column: &str, value: i64) -> Result<Usd> {
    u128::try_from(value)
        .map(Usd::from_units)
        .map_err(|_| corrupt(column))
}

fn usd_to_db(value: Usd) -> Result<i64> {
    i64::try_from(value.units())
        .map_err(|_| LaunchpadError::validation(format!("amount {value} exceeds storage range")))
}

fn tokens_from_db(column: &str, value: &str) -> Result<Tokens> {
    value.parse().map_err(|_| corrupt(column))
}

fn time_from_db(column: &str, millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| corrupt(column))
}

impl TryFrom<ProjectRow> for Project {
    type Error = LaunchpadError;

    fn try_from(row: ProjectRow) -> Result<Self> {
        Ok(Project {
            price_per_token: usd_from_db("price_per_token", row.price_per_token)?,
            total_supply: tokens_from_db("total_supply", &row.total_supply)?,
            allocation: tokens_from_db("allocation", &row.allocation)?,
            start_time: time_from_db("start_time", row.start_time)?,
            end_time: time_from_db("end_time", row.end_time)?,
            min_contribution: usd_from_db("min_contribution", row.min_contribution)?,
            max_contribution: usd_from_db("max_contribution", row.max_contribution)?,
            status: row.status.parse().map_err(|_| corrupt("status"))?,
            raised_amount: usd_from_db("raised_amount", row.raised_amount)?,
            created_at: time_from_db("created_at", row.created_at)?,
            updated_at: time_from_db("updated_at", row.updated_at)?,
            id: row.id,
            name: row.name,
            symbol: row.symbol,
            description: row.description,
            token_address: row.token_address,
            contributors_count: row.contributors_count,
            privacy_pool_address: row.privacy_pool_address,
        })
    }
}

impl TryFrom<ContributionRow> for Contribution {
    type Error = LaunchpadError;

    fn try_from(row: ContributionRow) -> Result<Self> {
        Ok(Contribution {
            amount: usd_from_db("amount", row.amount)?,
            token: row.token.parse().map_err(|_| corrupt("token"))?,
            tokens_allocated: tokens_from_db("tokens_allocated", &row.tokens_allocated)?,
            status: row.status.parse().map_err(|_| corrupt("status"))?,
            created_at: time_from_db("created_at", row.created_at)?,
            id: row.id,
            project_id: row.project_id,
            user_address: row.user_address,
            destination_address: row.destination_address,
            shield_tx_hash: row.shield_tx_hash,
            distribution_tx_hash: row.distribution_tx_hash,
        })
    }
}

// ─────────────────────────────────────────────────────────
// Project reads / writes
// ─────────────────────────────────────────────────────────

pub async fn insert_project(pool: &SqlitePool, project: &NewProject) -> Result<String> {
    let id = new_id();
    let now = Utc::now().timestamp_millis();
    sqlx::query(
        r#"
        INSERT INTO launchpad_projects
            (id, name, symbol, description, token_address, price_per_token, total_supply,
             allocation, start_time, end_time, min_contribution, max_contribution, status,
             privacy_pool_address, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)
        "#,
    )
    .bind(&id)
    .bind(&project.name)
    .bind(&project.symbol)
    .bind(&project.description)
    .bind(&project.token_address)
    .bind(usd_to_db(project.price_per_token)?)
    .bind(project.total_supply.to_string())
    .bind(project.allocation.to_string())
    .bind(project.start_time.timestamp_millis())
    .bind(project.end_time.timestamp_millis())
    .bind(usd_to_db(project.min_contribution)?)
    .bind(usd_to_db(project.max_contribution)?)
    .bind(ProjectStatus::Upcoming.as_str())
    .bind(&project.privacy_pool_address)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn get_project(pool: &SqlitePool, id: &str) -> Result<Project> {
    let row = sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM launchpad_projects WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.ok_or_else(|| LaunchpadError::NotFound(format!("project {id} not found")))?
        .try_into()
}

/// Fetch all projects, most recent start first.
pub async fn list_projects(pool: &SqlitePool) -> Result<Vec<Project>> {
    sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM launchpad_projects ORDER BY start_time DESC, id ASC"
    ))
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(Project::try_from)
    .collect()
}

pub async fn update_project_status(
    pool: &SqlitePool,
    id: &str,
    expected: ProjectStatus,
    status: ProjectStatus,
) -> Result<()> {
    let rows = sqlx::query(
        r#"
        UPDATE launchpad_projects
        SET    status = ?1, updated_at = ?2
        WHERE  id = ?3 AND status = ?4 AND distribution_lock IS NULL
        "#,
    )
    .bind(status.as_str())
    .bind(Utc::now().timestamp_millis())
    .bind(id)
    .bind(expected.as_str())
    .execute(pool)
    .await?
    .rows_affected();

    if rows == 0 {
        // Distinguish a missing project from a lost race.
        get_project(pool, id).await?;
        return Err(LaunchpadError::conflict(format!(
            "project {id} changed while updating its status"
        )));
    }
    Ok(())
}

/// Add to a project's aggregates in one statement.
///
/// The guard on `raised_amount` keeps SQLite from silently promoting an
/// overflowing sum to REAL.
pub async fn increment_project_aggregate(
    conn: &mut SqliteConnection,
    project_id: &str,
    amount_delta: Usd,
    contributor_delta: i64,
) -> Result<()> {
    let delta = usd_to_db(amount_delta)?;
    let rows = sqlx::query(
        r#"
        UPDATE launchpad_projects
        SET    raised_amount      = raised_amount + ?1,
               contributors_count = contributors_count + ?2,
               updated_at         = ?3
        WHERE  id = ?4
          AND  raised_amount <= 9223372036854775807 - ?1
        "#,
    )
    .bind(delta)
    .bind(contributor_delta)
    .bind(Utc::now().timestamp_millis())
    .bind(project_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if rows == 0 {
        return Err(LaunchpadError::validation(format!(
            "cannot add {amount_delta} to project {project_id}"
        )));
    }
    Ok(())
}

/// Complete the project and release the distribution lock held under
/// `lock_token`.
///
/// Fails with `Conflict` if the lock is no longer held by `lock_token` or the
/// project left the distributable statuses.
pub async fn mark_project_completed(
    conn: &mut SqliteConnection,
    project_id: &str,
    lock_token: &str,
) -> Result<()> {
    let rows = sqlx::query(
        r#"
        UPDATE launchpad_projects
        SET    status = ?1, distribution_lock = NULL, updated_at = ?2
        WHERE  id = ?3 AND distribution_lock = ?4 AND status IN (?5, ?1)
        "#,
    )
    .bind(ProjectStatus::Completed.as_str())
    .bind(Utc::now().timestamp_millis())
    .bind(project_id)
    .bind(lock_token)
    .bind(ProjectStatus::Active.as_str())
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if rows == 0 {
        return Err(LaunchpadError::conflict(format!(
            "project {project_id} changed during distribution"
        )));
    }
    Ok(())
}

/// Take the distribution lock for `lock_token`. Only a free lock on an
/// `active` or `completed` project can be taken.
pub async fn try_lock_distribution(
    pool: &SqlitePool,
    project_id: &str,
    lock_token: &str,
) -> Result<bool> {
    let rows = sqlx::query(
        r#"
        UPDATE launchpad_projects
        SET    distribution_lock = ?1
        WHERE  id = ?2 AND distribution_lock IS NULL AND status IN (?3, ?4)
        "#,
    )
    .bind(lock_token)
    .bind(project_id)
    .bind(ProjectStatus::Active.as_str())
    .bind(ProjectStatus::Completed.as_str())
    .execute(pool)
    .await?
    .rows_affected();
    Ok(rows == 1)
}

/// Release the lock if `lock_token` still holds it. A no-op otherwise.
pub async fn unlock_distribution(pool: &SqlitePool, project_id: &str, lock_token: &str) -> Result<()> {
    sqlx::query(
        "UPDATE launchpad_projects SET distribution_lock = NULL WHERE id = ?1 AND distribution_lock = ?2",
    )
    .bind(project_id)
    .bind(lock_token)
    .execute(pool)
    .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Contribution reads / writes
// ─────────────────────────────────────────────────────────

pub async fn insert_contribution(
    conn: &mut SqliteConnection,
    contribution: &Contribution,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO launchpad_contributions
            (id, project_id, user_address, destination_address, amount, token,
             tokens_allocated, shield_tx_hash, distribution_tx_hash, status, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&contribution.id)
    .bind(&contribution.project_id)
    .bind(&contribution.user_address)
    .bind(&contribution.destination_address)
    .bind(usd_to_db(contribution.amount)?)
    .bind(contribution.token.as_str())
    .bind(contribution.tokens_allocated.to_string())
    .bind(&contribution.shield_tx_hash)
    .bind(&contribution.distribution_tx_hash)
    .bind(contribution.status.as_str())
    .bind(contribution.created_at.timestamp_millis())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Allocate each listed contribution that is still pending.
///
/// Returns the number of rows that moved; callers compare it to
/// `contribution_ids.len()`.
pub async fn mark_contributions_allocated(
    conn: &mut SqliteConnection,
    project_id: &str,
    contribution_ids: &[String],
    distribution_tx_hash: &str,
) -> Result<u64> {
    let mut moved = 0u64;
    for id in contribution_ids {
        moved += sqlx::query(
            r#"
            UPDATE launchpad_contributions
            SET    status = ?1, distribution_tx_hash = ?2
            WHERE  id = ?3 AND project_id = ?4 AND status = ?5
            "#,
        )
        .bind(ContributionStatus::Allocated.as_str())
        .bind(distribution_tx_hash)
        .bind(id)
        .bind(project_id)
        .bind(ContributionStatus::Pending.as_str())
        .execute(&mut *conn)
        .await?
        .rows_affected();
    }
    Ok(moved)
}

pub async fn list_pending_contributions(
    pool: &SqlitePool,
    project_id: &str,
) -> Result<Vec<Contribution>> {
    sqlx::query_as::<_, ContributionRow>(&format!(
        r#"
        SELECT {CONTRIBUTION_COLUMNS}
        FROM   launchpad_contributions
        WHERE  project_id = ?1 AND status = ?2
        ORDER  BY created_at ASC, id ASC
        "#
    ))
    .bind(project_id)
    .bind(ContributionStatus::Pending.as_str())
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(Contribution::try_from)
    .collect()
}

/// Fetch every contribution of a project, oldest first.
pub async fn list_contributions(pool: &SqlitePool, project_id: &str) -> Result<Vec<Contribution>> {
    sqlx::query_as::<_, ContributionRow>(&format!(
        r#"
        SELECT {CONTRIBUTION_COLUMNS}
        FROM   launchpad_contributions
        WHERE  project_id = ?1
        ORDER  BY created_at ASC, id ASC
        "#
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(Contribution::try_from)
    .collect()
}

/// Token amounts are TEXT, so the per-status sums are folded here with exact
/// arithmetic rather than in SQL.
pub async fn sum_contributions_by_status(
    pool: &SqlitePool,
    project_id: &str,
    user_address: &str,
) -> Result<Vec<StatusTotals>> {
    let rows: Vec<(String, i64, String)> = sqlx::query_as(
        r#"
        SELECT status, amount, tokens_allocated
        FROM   launchpad_contributions
        WHERE  project_id = ?1 AND user_address = ?2
        ORDER  BY status ASC
        "#,
    )
    .bind(project_id)
    .bind(user_address)
    .fetch_all(pool)
    .await?;

    let mut totals: Vec<StatusTotals> = Vec::new();
    for (status, amount, tokens) in rows {
        let status: ContributionStatus = status.parse().map_err(|_| corrupt("status"))?;
        let amount = usd_from_db("amount", amount)?;
        let tokens = tokens_from_db("tokens_allocated", &tokens)?;

        let overflow = || LaunchpadError::validation("contribution totals overflow");
        match totals.last_mut() {
            Some(group) if group.status == status => {
                group.amount = group.amount.checked_add(amount).ok_or_else(overflow)?;
                group.tokens_allocated =
                    group.tokens_allocated.checked_add(tokens).ok_or_else(overflow)?;
            }
            _ => totals.push(StatusTotals {
                status,
                amount,
                tokens_allocated: tokens,
            }),
        }
    }
    Ok(totals)
}

// ─────────────────────────────────────────────────────────
// ProjectStore
// ─────────────────────────────────────────────────────────

/// [`ProjectStore`] backed by a SQLite pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ProjectStore for SqliteStore {
    async fn insert_project(&self, project: &NewProject) -> Result<String> {
        insert_project(&self.pool, project).await
    }

    async fn get_project(&self, id: &str) -> Result<Project> {
        get_project(&self.pool, id).await
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        list_projects(&self.pool).await
    }

    async fn update_project_status(
        &self,
        id: &str,
        expected: ProjectStatus,
        status: ProjectStatus,
    ) -> Result<()> {
        update_project_status(&self.pool, id, expected, status).await
    }

    async fn record_contribution(
        &self,
        contribution: &Contribution,
        amount_delta: Usd,
        contributor_delta: i64,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        insert_contribution(&mut tx, contribution).await?;
        increment_project_aggregate(
            &mut tx,
            &contribution.project_id,
            amount_delta,
            contributor_delta,
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_pending_contributions(&self, project_id: &str) -> Result<Vec<Contribution>> {
        list_pending_contributions(&self.pool, project_id).await
    }

    async fn list_contributions(&self, project_id: &str) -> Result<Vec<Contribution>> {
        list_contributions(&self.pool, project_id).await
    }

    async fn try_lock_distribution(&self, project_id: &str, lock_token: &str) -> Result<bool> {
        try_lock_distribution(&self.pool, project_id, lock_token).await
    }

    async fn unlock_distribution(&self, project_id: &str, lock_token: &str) -> Result<()> {
        unlock_distribution(&self.pool, project_id, lock_token).await
    }

    async fn finalize_distribution(
        &self,
        project_id: &str,
        lock_token: &str,
        contribution_ids: &[String],
        distribution_tx_hash: &str,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let moved =
            mark_contributions_allocated(&mut tx, project_id, contribution_ids, distribution_tx_hash)
                .await?;
        if moved != contribution_ids.len() as u64 {
            // Dropping `tx` rolls back the rows already moved.
            return Err(LaunchpadError::conflict(format!(
                "only {moved} of {} contributions were still pending",
                contribution_ids.len()
            )));
        }
        mark_project_completed(&mut tx, project_id, lock_token).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn sum_contributions_by_status(
        &self,
        project_id: &str,
        user_address: &str,
    ) -> Result<Vec<StatusTotals>> {
        sum_contributions_by_status(&self.pool, project_id, user_address).await
    }
}
