//! # Campaign Database Operations
//!
//! Async persistence for campaigns, leads and call records on sqlite via
//! sqlx. The schema is created on startup, every write is a plain
//! conditional statement, and anything the dispatch loop relies on for
//! correctness (the lead claim, the synthesized-status write-back) is a
//! single `UPDATE ... WHERE` whose `rows_affected` tells the caller whether
//! it won.
//!
//! The database is shared with the remote conversational agent's bridge,
//! which writes survey fields and terminal statuses into call records while
//! a call is live. Those writes are authoritative: nothing in this module
//! ever replaces a terminal record status with another one.

mod call_records;
mod campaigns;
mod leads;

pub use call_records::{RecordStats, SurveyUpdate};
pub use campaigns::NewCampaign;
pub use leads::{LeadStatusCount, NewLead};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::Result;

/// Lifecycle of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Pending,
    Active,
    Paused,
    Done,
}

/// Lifecycle of a lead. `Calling` and `Called` are transient; the rest are
/// terminal for the current attempt (some of them retryable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    Pending,
    Calling,
    Called,
    Completed,
    Failed,
    Incomplete,
    Unreached,
    Rejected,
}

impl LeadStatus {
    /// Statuses that can re-enter the pool while retry budget remains.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LeadStatus::Failed | LeadStatus::Unreached | LeadStatus::Incomplete
        )
    }

    /// Statuses that mean an attempt is (or may still be) in flight.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, LeadStatus::Calling | LeadStatus::Called)
    }
}

/// Lifecycle of a call record. Written once as `Initiated` by the
/// orchestrator; everything else comes from the remote agent, except the
/// synthesized `Unreached`/`Failed` write-backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CallRecordStatus {
    Initiated,
    Completed,
    Rejected,
    Failed,
    Incomplete,
    Unreached,
}

impl CallRecordStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CallRecordStatus::Initiated)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Campaign {
    pub id: i64,
    pub name: String,
    pub status: CampaignStatus,
    pub max_retries: i64,
    pub retry_interval_secs: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Lead {
    pub id: i64,
    pub campaign_id: i64,
    pub phone_number: String,
    pub display_name: String,
    pub status: LeadStatus,
    pub retries_attempted: i64,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub last_call_at: Option<DateTime<Utc>>,
    pub call_record_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CallRecord {
    pub id: i64,
    pub phone_number: String,
    pub contact_name: String,
    pub status: CallRecordStatus,
    pub completed: bool,
    pub score_sales_rep: Option<i64>,
    pub score_installer: Option<i64>,
    pub score_speed: Option<i64>,
    pub comment: Option<String>,
    pub transcript: Option<String>,
    pub duration_secs: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CallRecord {
    /// Session name for this attempt. The remote agent parses the record id
    /// back out of the last `_`-separated token, so the shape is part of
    /// the contract.
    pub fn session_name(&self) -> String {
        session_name_for(self.id)
    }
}

/// Derive the telephony session name for a call record id.
pub fn session_name_for(record_id: i64) -> String {
    format!("survey_{record_id}")
}

/// Async database manager holding the shared connection pool.
#[derive(Clone)]
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    /// Open (or create) the database and bring the schema up.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let (options, max_connections) = match &config.database_path {
            Some(path) => (
                SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true),
                config.max_connections,
            ),
            // A pooled in-memory database needs a single shared connection,
            // otherwise every checkout sees a fresh empty database.
            None => (
                SqliteConnectOptions::from_str(":memory:")?,
                1,
            ),
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let manager = Self { pool };
        manager.initialize_schema().await?;
        info!(
            "💾 Database ready ({})",
            config.database_path.as_deref().unwrap_or(":memory:")
        );
        Ok(manager)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS campaigns (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                name                TEXT NOT NULL,
                status              TEXT NOT NULL DEFAULT 'pending',
                max_retries         INTEGER NOT NULL DEFAULT 3,
                retry_interval_secs INTEGER NOT NULL DEFAULT 180,
                created_at          TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS leads (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                campaign_id       INTEGER NOT NULL REFERENCES campaigns(id),
                phone_number      TEXT NOT NULL,
                display_name      TEXT NOT NULL DEFAULT '',
                status            TEXT NOT NULL DEFAULT 'pending',
                retries_attempted INTEGER NOT NULL DEFAULT 0,
                next_retry_at     TEXT,
                last_call_at      TEXT,
                call_record_id    INTEGER,
                created_at        TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS call_records (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                phone_number    TEXT NOT NULL,
                contact_name    TEXT NOT NULL DEFAULT '',
                status          TEXT NOT NULL DEFAULT 'initiated',
                completed       INTEGER NOT NULL DEFAULT 0,
                score_sales_rep INTEGER,
                score_installer INTEGER,
                score_speed     INTEGER,
                comment         TEXT,
                transcript      TEXT,
                duration_secs   INTEGER,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_leads_campaign_status ON leads(campaign_id, status)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_leads_next_retry ON leads(next_retry_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
