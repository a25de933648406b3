//! # Types
//!
//! Shared data structures used across the launchpad.
//!
//! ## Status as a Finite-State Machine
//!
//! [`ProjectStatus`] is forward-only:
//!
//! ```text
//! Upcoming ──► Active ──► Completed
//!     │           │
//!     └───────────┴──► Cancelled
//! ```
//!
//! `Active → Completed` belongs to the distribution batch alone; every other
//! edge is an administrative decision.
//!
//! Values handed out by the service are snapshots. Mutating them never
//! reaches storage.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::amount::{Tokens, Usd};
use crate::errors::{LaunchpadError, Result};

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Announced; not yet accepting contributions.
    Upcoming,
    /// Accepting contributions inside its time window.
    Active,
    /// Tokens distributed.
    Completed,
    Cancelled,
}

impl ProjectStatus {
    /// Return a short identifier string suitable for storage in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether an administrator may move a project from `self` to `next`.
    ///
    /// `Completed` is never an administrative target.
    pub fn admin_can_transition_to(&self, next: ProjectStatus) -> bool {
        matches!(
            (self, next),
            (Self::Upcoming, Self::Active)
                | (Self::Upcoming, Self::Cancelled)
                | (Self::Active, Self::Cancelled)
        )
    }
}

impl FromStr for ProjectStatus {
    type Err = LaunchpadError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "upcoming" => Ok(Self::Upcoming),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(LaunchpadError::validation(format!(
                "unknown project status: {other}"
            ))),
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a single contribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionStatus {
    /// Recorded; tokens not yet distributed.
    #[default]
    Pending,
    /// Finalized by a distribution batch.
    Allocated,
    /// Returned to the contributor. No code path in this service sets it.
    Refunded,
}

impl ContributionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Allocated => "allocated",
            Self::Refunded => "refunded",
        }
    }
}

impl FromStr for ContributionStatus {
    type Err = LaunchpadError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "allocated" => Ok(Self::Allocated),
            "refunded" => Ok(Self::Refunded),
            other => Err(LaunchpadError::validation(format!(
                "unknown contribution status: {other}"
            ))),
        }
    }
}

/// Stablecoin a contribution is paid in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    #[serde(rename = "USDT")]
    Usdt,
    #[serde(rename = "USDC")]
    Usdc,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usdt => "USDT",
            Self::Usdc => "USDC",
        }
    }
}

impl FromStr for TokenKind {
    type Err = LaunchpadError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "USDT" => Ok(Self::Usdt),
            "USDC" => Ok(Self::Usdc),
            other => Err(LaunchpadError::validation(format!("unsupported token: {other}"))),
        }
    }
}

/// A launchpad project as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub description: Option<String>,
    /// Address of the sold token, once deployed.
    pub token_address: Option<String>,
    pub price_per_token: Usd,
    pub total_supply: Tokens,
    /// Sale cap.
    pub allocation: Tokens,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    pub min_contribution: Usd,
    pub max_contribution: Usd,
    pub status: ProjectStatus,
    /// Sum of every contribution's amount.
    pub raised_amount: Usd,
    /// Number of contribution records.
    pub contributors_count: i64,
    pub privacy_pool_address: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Whether `now` falls inside `[start_time, end_time]`.
    pub fn in_contribution_period(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now <= self.end_time
    }
}

/// Fields supplied when registering a project.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub token_address: Option<String>,
    pub price_per_token: Usd,
    pub total_supply: Tokens,
    pub allocation: Tokens,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    pub min_contribution: Usd,
    pub max_contribution: Usd,
    pub privacy_pool_address: String,
}

impl NewProject {
    pub fn validate(&self) -> Result<()> {
        let name_len = self.name.chars().count();
        if name_len == 0 || name_len > 255 {
            return Err(LaunchpadError::validation("name must be 1-255 characters"));
        }
        let symbol_len = self.symbol.chars().count();
        if symbol_len == 0 || symbol_len > 50 {
            return Err(LaunchpadError::validation("symbol must be 1-50 characters"));
        }
        if let Some(addr) = &self.token_address {
            if !is_evm_address(addr) {
                return Err(LaunchpadError::validation("invalid token address"));
            }
        }
        if !is_evm_address(&self.privacy_pool_address) {
            return Err(LaunchpadError::validation("invalid privacy pool address"));
        }
        if self.price_per_token.is_zero() {
            return Err(LaunchpadError::validation("price per token must be positive"));
        }
        if self.min_contribution > self.max_contribution {
            return Err(LaunchpadError::validation(
                "minimum contribution exceeds maximum contribution",
            ));
        }
        if self.start_time >= self.end_time {
            return Err(LaunchpadError::validation("start time must precede end time"));
        }
        Ok(())
    }
}

/// One recorded pledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub id: String,
    pub project_id: String,
    /// Public address that signed the shield transfer.
    pub user_address: String,
    /// Shielded address the tokens are meant to reach, if given.
    pub destination_address: Option<String>,
    pub amount: Usd,
    pub token: TokenKind,
    pub tokens_allocated: Tokens,
    pub shield_tx_hash: String,
    pub distribution_tx_hash: Option<String>,
    pub status: ContributionStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// Per-status totals of one contributor's pledges to one project.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusTotals {
    pub status: ContributionStatus,
    pub amount: Usd,
    pub tokens_allocated: Tokens,
}

/// Reporting view returned by `contribution_status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContributionSummary {
    pub contributed: Usd,
    pub tokens_allocated: Tokens,
    pub status: ContributionStatus,
}

/// Result of recomputing a project's ledger from its contributions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectAudit {
    pub project_id: String,
    pub raised_amount: Usd,
    pub recorded_amount: Usd,
    pub contributors_count: i64,
    pub recorded_contributions: i64,
    /// Contributions whose stored allocation differs from a fresh computation.
    pub mismatched_allocations: Vec<String>,
    pub consistent: bool,
}

/// A pledge as submitted by a contributor.
#[derive(Debug, Clone, Deserialize)]
pub struct ContributeRequest {
    pub project_id: String,
    /// Decimal string; parsed at six decimals.
    pub amount: String,
    pub token: TokenKind,
    #[serde(default)]
    pub destination_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributeResponse {
    pub shield_tx_hash: String,
    pub contribution_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributeResponse {
    pub distribution_tx_hash: String,
}

/// `0x` followed by exactly 40 hex digits.
pub fn is_evm_address(s: &str) -> bool {
    s.strip_prefix("0x")
        .map(|hex| hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
        .unwrap_or(false)
}

/// Fresh opaque identifier: 16 random bytes, hex encoded.
pub fn new_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
