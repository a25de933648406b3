use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};

use crate::amount::{Tokens, Usd};
use crate::db::{self, SqliteStore};
use crate::errors::{LaunchpadError, Result};
use crate::launchpad::Launchpad;
use crate::store::ProjectStore;
use crate::testutils::{
    active_project, launchpad, launchpad_with, memory_store, new_project, now, pledge,
    MockSigner, ADMIN, ALICE, BOB, POOL_ADDRESS,
};
use crate::types::{
    new_id, Contribution, ContributionStatus, NewProject, Project, ProjectStatus, StatusTotals,
    TokenKind,
};

fn usd(s: &str) -> Usd {
    s.parse().unwrap()
}

/// Active project priced at 1.0 with pledges of 1000 from Alice and 2000 from Bob.
async fn funded_project(lp: &Launchpad) -> Project {
    let mut listing = new_project();
    listing.price_per_token = usd("1");
    let project = active_project(lp, listing).await;
    lp.contribute(&pledge(&project.id, "1000"), Arc::new(MockSigner::confirming(ALICE)), None)
        .await
        .unwrap();
    lp.contribute(&pledge(&project.id, "2000"), Arc::new(MockSigner::confirming(BOB)), None)
        .await
        .unwrap();
    project
}

fn pending_contribution(project_id: &str, amount: &str) -> Contribution {
    let amount = usd(amount);
    Contribution {
        id: new_id(),
        project_id: project_id.to_string(),
        user_address: ALICE.to_string(),
        destination_address: None,
        amount,
        token: TokenKind::Usdt,
        tokens_allocated: Tokens::from_units(amount.units() * 1_000_000_000_000),
        shield_tx_hash: format!("0x{}", "ab".repeat(32)),
        distribution_tx_hash: None,
        status: ContributionStatus::Pending,
        created_at: Utc::now(),
    }
}

/// What [`HookedStore`] does around `try_lock_distribution`.
#[derive(Clone, Copy)]
enum LockHook {
    /// An admin cancels the project just before the lock is attempted.
    CancelFirst,
    /// The lock lands, then the call stalls.
    StallAfter(Duration),
}

/// SQLite store with a hook on the lock acquisition.
struct HookedStore {
    inner: Arc<SqliteStore>,
    hook: LockHook,
}

#[async_trait]
impl ProjectStore for HookedStore {
    async fn insert_project(&self, project: &NewProject) -> Result<String> {
        self.inner.insert_project(project).await
    }

    async fn get_project(&self, id: &str) -> Result<Project> {
        self.inner.get_project(id).await
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.inner.list_projects().await
    }

    async fn update_project_status(
        &self,
        id: &str,
        expected: ProjectStatus,
        status: ProjectStatus,
    ) -> Result<()> {
        self.inner.update_project_status(id, expected, status).await
    }

    async fn record_contribution(
        &self,
        contribution: &Contribution,
        amount_delta: Usd,
        contributor_delta: i64,
    ) -> Result<()> {
        self.inner
            .record_contribution(contribution, amount_delta, contributor_delta)
            .await
    }

    async fn list_pending_contributions(&self, project_id: &str) -> Result<Vec<Contribution>> {
        self.inner.list_pending_contributions(project_id).await
    }

    async fn list_contributions(&self, project_id: &str) -> Result<Vec<Contribution>> {
        self.inner.list_contributions(project_id).await
    }

    async fn try_lock_distribution(&self, project_id: &str, lock_token: &str) -> Result<bool> {
        match self.hook {
            LockHook::CancelFirst => {
                self.inner
                    .update_project_status(project_id, ProjectStatus::Active, ProjectStatus::Cancelled)
                    .await?;
                self.inner.try_lock_distribution(project_id, lock_token).await
            }
            LockHook::StallAfter(stall) => {
                let locked = self.inner.try_lock_distribution(project_id, lock_token).await?;
                tokio::time::sleep(stall).await;
                Ok(locked)
            }
        }
    }

    async fn unlock_distribution(&self, project_id: &str, lock_token: &str) -> Result<()> {
        self.inner.unlock_distribution(project_id, lock_token).await
    }

    async fn finalize_distribution(
        &self,
        project_id: &str,
        lock_token: &str,
        contribution_ids: &[String],
        distribution_tx_hash: &str,
    ) -> Result<()> {
        self.inner
            .finalize_distribution(project_id, lock_token, contribution_ids, distribution_tx_hash)
            .await
    }

    async fn sum_contributions_by_status(
        &self,
        project_id: &str,
        user_address: &str,
    ) -> Result<Vec<StatusTotals>> {
        self.inner
            .sum_contributions_by_status(project_id, user_address)
            .await
    }
}

#[tokio::test]
async fn test_distribution_allocates_the_whole_batch() {
    let store = memory_store().await;
    let lp = launchpad(store.clone(), now());
    let project = funded_project(&lp).await;
    let admin = Arc::new(MockSigner::confirming(ADMIN));

    let res = lp.distribute(&project.id, admin.clone(), None).await.unwrap();

    let rows = db::list_contributions(store.pool(), &project.id).await.unwrap();
    assert_eq!(rows.len(), 2);
    for c in &rows {
        assert_eq!(c.status, ContributionStatus::Allocated);
        assert_eq!(
            c.distribution_tx_hash.as_deref(),
            Some(res.distribution_tx_hash.as_str())
        );
    }
    let mut allocations: Vec<String> = rows.iter().map(|c| c.tokens_allocated.to_string()).collect();
    allocations.sort();
    assert_eq!(allocations, vec!["1000.0", "2000.0"]);

    let after = lp.get_project(&project.id).await.unwrap();
    assert_eq!(after.status, ProjectStatus::Completed);
    assert_eq!(after.raised_amount, usd("3000"));

    let sent = admin.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, POOL_ADDRESS);
    assert_eq!(sent[0].value, None);
    assert_eq!(sent[0].call, "distributeTokens()");

    // Lock released: a new batch is refused for lack of work, not contention.
    let err = lp.distribute(&project.id, admin.clone(), None).await.unwrap_err();
    assert!(
        matches!(&err, LaunchpadError::Conflict(m) if m == "no pending contributions to distribute")
    );
}

#[tokio::test]
async fn test_distribution_targets_the_token_contract_when_set() {
    let store = memory_store().await;
    let lp = launchpad(store, now());
    let token = "0x2222222222222222222222222222222222222222";
    let mut listing = new_project();
    listing.token_address = Some(token.to_string());
    let project = active_project(&lp, listing).await;
    lp.contribute(&pledge(&project.id, "1000"), Arc::new(MockSigner::confirming(ALICE)), None)
        .await
        .unwrap();

    let admin = Arc::new(MockSigner::confirming(ADMIN));
    lp.distribute(&project.id, admin.clone(), None).await.unwrap();
    assert_eq!(admin.requests()[0].to, token);
}

#[tokio::test]
async fn test_empty_batch_is_a_conflict() {
    let store = memory_store().await;
    let lp = launchpad(store.clone(), now());
    let project = active_project(&lp, new_project()).await;
    let admin = Arc::new(MockSigner::confirming(ADMIN));

    let err = lp.distribute(&project.id, admin.clone(), None).await.unwrap_err();
    assert!(
        matches!(&err, LaunchpadError::Conflict(m) if m == "no pending contributions to distribute")
    );
    assert!(admin.requests().is_empty());

    let after = lp.get_project(&project.id).await.unwrap();
    assert_eq!(after.status, ProjectStatus::Active);
    assert!(store.try_lock_distribution(&project.id, "operator").await.unwrap());
}

#[tokio::test]
async fn test_unconfirmed_distribution_changes_nothing() {
    let store = memory_store().await;
    let lp = launchpad(store.clone(), now());
    let project = funded_project(&lp).await;

    let err = lp
        .distribute(&project.id, Arc::new(MockSigner::failing(ADMIN)), None)
        .await
        .unwrap_err();
    assert!(
        matches!(&err, LaunchpadError::Transaction(m) if m == "distribution transaction failed")
    );

    let rows = db::list_contributions(store.pool(), &project.id).await.unwrap();
    assert!(rows
        .iter()
        .all(|c| c.status == ContributionStatus::Pending && c.distribution_tx_hash.is_none()));
    let after = lp.get_project(&project.id).await.unwrap();
    assert_eq!(after.status, ProjectStatus::Active);

    // Retry picks up the same batch.
    lp.distribute(&project.id, Arc::new(MockSigner::confirming(ADMIN)), None)
        .await
        .unwrap();
    let rows = db::list_contributions(store.pool(), &project.id).await.unwrap();
    assert!(rows.iter().all(|c| c.status == ContributionStatus::Allocated));
}

#[tokio::test]
async fn test_projects_not_open_for_distribution_are_rejected() {
    let store = memory_store().await;
    let lp = launchpad(store, now());
    let admin = Arc::new(MockSigner::confirming(ADMIN));

    let upcoming = lp.create_project(&new_project()).await.unwrap();
    let err = lp.distribute(&upcoming.id, admin.clone(), None).await.unwrap_err();
    assert!(matches!(err, LaunchpadError::Validation(_)));

    lp.update_project_status(&upcoming.id, ProjectStatus::Cancelled)
        .await
        .unwrap();
    let err = lp.distribute(&upcoming.id, admin.clone(), None).await.unwrap_err();
    assert!(matches!(err, LaunchpadError::Validation(_)));

    let err = lp.distribute("missing", admin.clone(), None).await.unwrap_err();
    assert!(matches!(err, LaunchpadError::NotFound(_)));
    assert!(admin.requests().is_empty());
}

#[tokio::test]
async fn test_completed_project_distributes_only_new_pledges() {
    let store = memory_store().await;
    let lp = launchpad(store.clone(), now());
    let project = funded_project(&lp).await;
    let first = lp
        .distribute(&project.id, Arc::new(MockSigner::confirming(ADMIN)), None)
        .await
        .unwrap();

    let late = pending_contribution(&project.id, "500");
    store.record_contribution(&late, late.amount, 1).await.unwrap();

    let second = lp
        .distribute(&project.id, Arc::new(MockSigner::confirming(ADMIN)), None)
        .await
        .unwrap();
    assert_ne!(first.distribution_tx_hash, second.distribution_tx_hash);

    let rows = db::list_contributions(store.pool(), &project.id).await.unwrap();
    assert_eq!(rows.len(), 3);
    for c in &rows {
        assert_eq!(c.status, ContributionStatus::Allocated);
        let expected = if c.id == late.id {
            &second.distribution_tx_hash
        } else {
            &first.distribution_tx_hash
        };
        assert_eq!(c.distribution_tx_hash.as_ref(), Some(expected));
    }
}

#[tokio::test]
async fn test_held_lock_refuses_a_second_batch() {
    let store = memory_store().await;
    let lp = launchpad(store.clone(), now());
    let project = funded_project(&lp).await;
    assert!(store.try_lock_distribution(&project.id, "operator").await.unwrap());

    let admin = Arc::new(MockSigner::confirming(ADMIN));
    let err = lp.distribute(&project.id, admin.clone(), None).await.unwrap_err();
    assert!(
        matches!(&err, LaunchpadError::Conflict(m) if m == "distribution already in progress")
    );
    assert!(admin.requests().is_empty());

    store.unlock_distribution(&project.id, "operator").await.unwrap();
    lp.distribute(&project.id, admin.clone(), None).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_batches_submit_once() {
    let store = memory_store().await;
    let lp = Arc::new(launchpad(store.clone(), now()));
    let project = funded_project(&lp).await;
    let admin =
        Arc::new(MockSigner::confirming(ADMIN).with_send_delay(Duration::from_millis(200)));

    let spawn = |lp: Arc<Launchpad>, admin: Arc<MockSigner>, id: String| {
        tokio::spawn(async move { lp.distribute(&id, admin.clone(), None).await })
    };
    let a = spawn(lp.clone(), admin.clone(), project.id.clone());
    let b = spawn(lp.clone(), admin.clone(), project.id.clone());
    let results = [a.await.unwrap(), b.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(LaunchpadError::Conflict(_)))));
    assert_eq!(admin.requests().len(), 1);

    let rows = db::list_contributions(store.pool(), &project.id).await.unwrap();
    assert!(rows.iter().all(|c| c.status == ContributionStatus::Allocated));
}

#[tokio::test]
async fn test_finalize_rolls_back_when_a_contribution_already_moved() {
    let store = memory_store().await;
    let lp = launchpad(store.clone(), now());
    let project = funded_project(&lp).await;
    let pending = store.list_pending_contributions(&project.id).await.unwrap();
    let ids: Vec<String> = pending.iter().map(|c| c.id.clone()).collect();

    assert!(store.try_lock_distribution(&project.id, "batch-a").await.unwrap());
    store
        .finalize_distribution(&project.id, "batch-a", &ids[..1], "0xfirst")
        .await
        .unwrap();

    assert!(store.try_lock_distribution(&project.id, "batch-b").await.unwrap());
    let err = store
        .finalize_distribution(&project.id, "batch-b", &ids, "0xsecond")
        .await
        .unwrap_err();
    assert!(matches!(err, LaunchpadError::Conflict(_)));

    let rows = db::list_contributions(store.pool(), &project.id).await.unwrap();
    for c in &rows {
        if c.id == ids[0] {
            assert_eq!(c.distribution_tx_hash.as_deref(), Some("0xfirst"));
        } else {
            assert_eq!(c.status, ContributionStatus::Pending);
            assert!(c.distribution_tx_hash.is_none());
        }
    }
}

#[tokio::test]
async fn test_expired_deadline_aborts_distribution() {
    let store = memory_store().await;
    let lp = launchpad(store.clone(), now());
    let project = funded_project(&lp).await;
    let admin = Arc::new(MockSigner::confirming(ADMIN));

    // Hold the pool's only connection so loading the project stalls.
    let conn = store.pool().acquire().await.unwrap();
    let err = lp
        .distribute(&project.id, admin.clone(), Some(Duration::from_millis(50)))
        .await
        .unwrap_err();
    drop(conn);

    assert!(matches!(err, LaunchpadError::Timeout));
    assert!(admin.requests().is_empty());
    assert!(store.try_lock_distribution(&project.id, "operator").await.unwrap());
}

#[tokio::test]
async fn test_abandoned_caller_does_not_strand_the_lock() {
    let store = memory_store().await;
    let lp = launchpad(store.clone(), now());
    let project = funded_project(&lp).await;
    let admin = Arc::new(MockSigner::confirming(ADMIN).with_send_delay(Duration::from_millis(200)));

    // The caller gives up while the distribution transaction is in flight.
    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        lp.distribute(&project.id, admin.clone(), None),
    )
    .await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(400)).await;

    let rows = db::list_contributions(store.pool(), &project.id).await.unwrap();
    assert!(rows
        .iter()
        .all(|c| c.status == ContributionStatus::Allocated && c.distribution_tx_hash.is_some()));
    let after = lp.get_project(&project.id).await.unwrap();
    assert_eq!(after.status, ProjectStatus::Completed);

    let err = lp.distribute(&project.id, admin.clone(), None).await.unwrap_err();
    assert!(
        matches!(&err, LaunchpadError::Conflict(m) if m == "no pending contributions to distribute")
    );
    assert_eq!(admin.requests().len(), 1);
}

#[tokio::test]
async fn test_cancellation_racing_the_lock_wins() {
    let store = memory_store().await;
    let setup = launchpad(store.clone(), now());
    let project = funded_project(&setup).await;
    let hooked = Arc::new(HookedStore {
        inner: store.clone(),
        hook: LockHook::CancelFirst,
    });
    let lp = launchpad_with(hooked, now());
    let admin = Arc::new(MockSigner::confirming(ADMIN));

    let err = lp.distribute(&project.id, admin.clone(), None).await.unwrap_err();
    assert!(matches!(err, LaunchpadError::Validation(_)));
    assert!(admin.requests().is_empty());

    let after = setup.get_project(&project.id).await.unwrap();
    assert_eq!(after.status, ProjectStatus::Cancelled);
    let rows = db::list_contributions(store.pool(), &project.id).await.unwrap();
    assert!(rows.iter().all(|c| c.status == ContributionStatus::Pending));
}

#[tokio::test]
async fn test_finalize_refuses_a_cancelled_project() {
    let store = memory_store().await;
    let lp = launchpad(store.clone(), now());
    let project = funded_project(&lp).await;
    let ids: Vec<String> = store
        .list_pending_contributions(&project.id)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert!(store.try_lock_distribution(&project.id, "batch").await.unwrap());

    sqlx::query("UPDATE launchpad_projects SET status = 'cancelled' WHERE id = ?1")
        .bind(&project.id)
        .execute(store.pool())
        .await
        .unwrap();

    let err = store
        .finalize_distribution(&project.id, "batch", &ids, "0xdead")
        .await
        .unwrap_err();
    assert!(matches!(err, LaunchpadError::Conflict(_)));
    assert_eq!(
        lp.get_project(&project.id).await.unwrap().status,
        ProjectStatus::Cancelled
    );
    let rows = db::list_contributions(store.pool(), &project.id).await.unwrap();
    assert!(rows.iter().all(|c| c.status == ContributionStatus::Pending));
}

#[tokio::test]
async fn test_finalize_requires_the_lock_holder() {
    let store = memory_store().await;
    let lp = launchpad(store.clone(), now());
    let project = funded_project(&lp).await;
    let ids: Vec<String> = store
        .list_pending_contributions(&project.id)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert!(store.try_lock_distribution(&project.id, "owner").await.unwrap());

    // Another token can neither release nor complete the batch.
    store.unlock_distribution(&project.id, "intruder").await.unwrap();
    assert!(!store.try_lock_distribution(&project.id, "intruder").await.unwrap());
    let err = store
        .finalize_distribution(&project.id, "intruder", &ids, "0xdead")
        .await
        .unwrap_err();
    assert!(matches!(err, LaunchpadError::Conflict(_)));

    store
        .finalize_distribution(&project.id, "owner", &ids, "0xbeef")
        .await
        .unwrap();
    assert_eq!(
        lp.get_project(&project.id).await.unwrap().status,
        ProjectStatus::Completed
    );
}

#[tokio::test]
async fn test_lock_taken_past_the_deadline_is_released() {
    let store = memory_store().await;
    let setup = launchpad(store.clone(), now());
    let project = funded_project(&setup).await;
    let hooked = Arc::new(HookedStore {
        inner: store.clone(),
        hook: LockHook::StallAfter(Duration::from_millis(300)),
    });
    let lp = launchpad_with(hooked, now());
    let admin = Arc::new(MockSigner::confirming(ADMIN));

    let err = lp
        .distribute(&project.id, admin.clone(), Some(Duration::from_millis(50)))
        .await
        .unwrap_err();
    assert!(matches!(err, LaunchpadError::Timeout));
    assert!(admin.requests().is_empty());

    assert!(store.try_lock_distribution(&project.id, "operator").await.unwrap());
    let rows = db::list_contributions(store.pool(), &project.id).await.unwrap();
    assert!(rows.iter().all(|c| c.status == ContributionStatus::Pending));
}

#[tokio::test]
async fn test_status_reports_allocation_after_distribution() {
    let store = memory_store().await;
    let lp = launchpad(store, now());
    let project = funded_project(&lp).await;
    lp.distribute(&project.id, Arc::new(MockSigner::confirming(ADMIN)), None)
        .await
        .unwrap();

    let status = lp.contribution_status(&project.id, BOB).await.unwrap();
    assert_eq!(status.contributed, usd("2000"));
    assert_eq!(status.tokens_allocated, Tokens::from_whole(2000).unwrap());
    assert_eq!(status.status, ContributionStatus::Allocated);

    let audit = lp.audit_project(&project.id).await.unwrap();
    assert!(audit.consistent);
    assert_eq!(audit.recorded_amount, usd("3000"));
}

#[tokio::test]
async fn test_audit_flags_aggregate_drift() {
    let store = memory_store().await;
    let lp = launchpad(store.clone(), now());
    let project = funded_project(&lp).await;

    sqlx::query("UPDATE launchpad_projects SET contributors_count = 5 WHERE id = ?1")
        .bind(&project.id)
        .execute(store.pool())
        .await
        .unwrap();

    let audit = lp.audit_project(&project.id).await.unwrap();
    assert!(!audit.consistent);
    assert_eq!(audit.contributors_count, 5);
    assert_eq!(audit.recorded_contributions, 2);
    assert!(audit.mismatched_allocations.is_empty());
}

// ─────────────────────────────────────────────────────────
// Admin lifecycle
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_admin_transitions() {
    let store = memory_store().await;
    let lp = launchpad(store, now());

    let project = lp.create_project(&new_project()).await.unwrap();
    assert_eq!(project.status, ProjectStatus::Upcoming);
    assert_eq!(project.raised_amount, Usd::ZERO);
    assert_eq!(project.contributors_count, 0);

    let err = lp
        .update_project_status(&project.id, ProjectStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(err, LaunchpadError::Validation(_)));

    let active = lp
        .update_project_status(&project.id, ProjectStatus::Active)
        .await
        .unwrap();
    assert_eq!(active.status, ProjectStatus::Active);

    let err = lp
        .update_project_status(&project.id, ProjectStatus::Upcoming)
        .await
        .unwrap_err();
    assert!(matches!(err, LaunchpadError::Validation(_)));

    let cancelled = lp
        .update_project_status(&project.id, ProjectStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(cancelled.status, ProjectStatus::Cancelled);

    let err = lp
        .update_project_status(&project.id, ProjectStatus::Active)
        .await
        .unwrap_err();
    assert!(matches!(err, LaunchpadError::Validation(_)));

    let err = lp
        .update_project_status("missing", ProjectStatus::Active)
        .await
        .unwrap_err();
    assert!(matches!(err, LaunchpadError::NotFound(_)));
}

#[tokio::test]
async fn test_cannot_cancel_during_a_batch() {
    let store = memory_store().await;
    let lp = launchpad(store.clone(), now());
    let project = funded_project(&lp).await;
    assert!(store.try_lock_distribution(&project.id, "operator").await.unwrap());

    let err = lp
        .update_project_status(&project.id, ProjectStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, LaunchpadError::Conflict(_)));
    assert_eq!(
        lp.get_project(&project.id).await.unwrap().status,
        ProjectStatus::Active
    );
}

#[tokio::test]
async fn test_invalid_listings_are_rejected() {
    let store = memory_store().await;
    let lp = launchpad(store, now());

    let mut zero_price = new_project();
    zero_price.price_per_token = Usd::ZERO;
    let mut inverted_limits = new_project();
    inverted_limits.min_contribution = usd("500");
    inverted_limits.max_contribution = usd("100");
    let mut inverted_window = new_project();
    inverted_window.end_time = inverted_window.start_time - ChronoDuration::hours(1);
    let mut bad_pool = new_project();
    bad_pool.privacy_pool_address = "pool".to_string();
    let mut no_name = new_project();
    no_name.name = String::new();

    for listing in [zero_price, inverted_limits, inverted_window, bad_pool, no_name] {
        let err = lp.create_project(&listing).await.unwrap_err();
        assert!(matches!(err, LaunchpadError::Validation(_)));
    }
    assert!(lp.list_projects().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_projects_list_latest_start_first() {
    let store = memory_store().await;
    let lp = launchpad(store, now());

    let mut older = new_project();
    older.symbol = "OLD".to_string();
    older.start_time = now() - ChronoDuration::days(10);
    let mut newer = new_project();
    newer.symbol = "NEW".to_string();
    newer.start_time = now() + ChronoDuration::days(1);
    newer.end_time = now() + ChronoDuration::days(5);

    lp.create_project(&older).await.unwrap();
    lp.create_project(&new_project()).await.unwrap();
    lp.create_project(&newer).await.unwrap();

    let symbols: Vec<String> = lp
        .list_projects()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.symbol)
        .collect();
    assert_eq!(symbols, vec!["NEW", "SHDW", "OLD"]);
}

#[tokio::test]
async fn test_project_round_trips_through_storage() {
    let store = memory_store().await;
    let lp = launchpad(store, now());
    let listing = new_project();

    let created = lp.create_project(&listing).await.unwrap();
    let fetched = lp.get_project(&created.id).await.unwrap();

    assert_eq!(fetched.name, listing.name);
    assert_eq!(fetched.description, listing.description);
    assert_eq!(fetched.price_per_token, listing.price_per_token);
    assert_eq!(fetched.total_supply, listing.total_supply);
    assert_eq!(fetched.allocation, listing.allocation);
    assert_eq!(fetched.start_time, listing.start_time);
    assert_eq!(fetched.end_time, listing.end_time);
    assert_eq!(fetched.min_contribution, listing.min_contribution);
    assert_eq!(fetched.max_contribution, listing.max_contribution);
    assert_eq!(fetched.privacy_pool_address, listing.privacy_pool_address);
    assert!(fetched.token_address.is_none());
}
