//! Lead persistence and the dial-claim operations
//!
//! Selection and claiming are separate on purpose: selection is a read,
//! while the claim is a conditional UPDATE keyed on the status the caller
//! saw. Only the claim winner may dial, which keeps the single-flight
//! invariant intact even if dispatch is ever parallelized.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{DatabaseManager, Lead, LeadStatus};
use crate::error::{DialerError, Result};

/// Parameters for adding a lead to a campaign.
#[derive(Debug, Clone)]
pub struct NewLead {
    pub phone_number: String,
    pub display_name: String,
}

/// Per-status lead counts for one campaign.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LeadStatusCount {
    pub status: LeadStatus,
    pub count: i64,
}

impl DatabaseManager {
    pub async fn insert_leads(&self, campaign_id: i64, leads: &[NewLead]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let mut inserted = 0u64;

        for lead in leads {
            let result = sqlx::query(
                "INSERT INTO leads
                     (campaign_id, phone_number, display_name, status, retries_attempted, created_at)
                 VALUES ($1, $2, $3, $4, 0, $5)",
            )
            .bind(campaign_id)
            .bind(&lead.phone_number)
            .bind(&lead.display_name)
            .bind(LeadStatus::Pending)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn get_lead(&self, id: i64) -> Result<Option<Lead>> {
        let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(lead)
    }

    pub async fn leads_for_campaign(&self, campaign_id: i64) -> Result<Vec<Lead>> {
        let leads =
            sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE campaign_id = $1 ORDER BY id")
                .bind(campaign_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(leads)
    }

    /// Oldest never-attempted lead of the campaign, if any.
    pub async fn next_pending_lead(&self, campaign_id: i64) -> Result<Option<Lead>> {
        let lead = sqlx::query_as::<_, Lead>(
            "SELECT * FROM leads
             WHERE campaign_id = $1 AND status = $2
             ORDER BY id LIMIT 1",
        )
        .bind(campaign_id)
        .bind(LeadStatus::Pending)
        .fetch_optional(&self.pool)
        .await?;
        Ok(lead)
    }

    /// Earliest-due retryable lead with budget left. Rejected leads never
    /// match regardless of their schedule.
    pub async fn next_retryable_lead(
        &self,
        campaign_id: i64,
        max_retries: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Lead>> {
        let lead = sqlx::query_as::<_, Lead>(
            "SELECT * FROM leads
             WHERE campaign_id = $1
               AND status IN ($2, $3, $4)
               AND retries_attempted < $5
               AND next_retry_at IS NOT NULL
               AND next_retry_at < $6
             ORDER BY next_retry_at LIMIT 1",
        )
        .bind(campaign_id)
        .bind(LeadStatus::Failed)
        .bind(LeadStatus::Unreached)
        .bind(LeadStatus::Incomplete)
        .bind(max_retries)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(lead)
    }

    /// Atomically move a lead into `calling`, stamping the attempt. The
    /// condition on the previously observed status makes this a claim: of
    /// two dispatchers racing on the same lead, exactly one sees a row
    /// affected.
    pub async fn claim_lead_for_dialing(
        &self,
        lead_id: i64,
        observed_status: LeadStatus,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE leads
             SET status = $1,
                 last_call_at = $2,
                 retries_attempted = retries_attempted + 1
             WHERE id = $3 AND status = $4",
        )
        .bind(LeadStatus::Calling)
        .bind(now)
        .bind(lead_id)
        .bind(observed_status)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record that the dial went out without an immediate error.
    pub async fn mark_lead_called(&self, lead_id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE leads SET status = $1 WHERE id = $2 AND status = $3")
            .bind(LeadStatus::Called)
            .bind(lead_id)
            .bind(LeadStatus::Calling)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Point the lead at the call record of its current attempt.
    pub async fn link_call_record(&self, lead_id: i64, record_id: i64) -> Result<()> {
        let result = sqlx::query("UPDATE leads SET call_record_id = $1 WHERE id = $2")
            .bind(record_id)
            .bind(lead_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DialerError::NotFound(format!("lead {lead_id}")));
        }
        Ok(())
    }

    /// Apply a terminal classification, with or without a retry schedule.
    pub async fn apply_lead_outcome(
        &self,
        lead_id: i64,
        status: LeadStatus,
        next_retry_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE leads SET status = $1, next_retry_at = $2 WHERE id = $3")
            .bind(status)
            .bind(next_retry_at)
            .bind(lead_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DialerError::NotFound(format!("lead {lead_id}")));
        }
        Ok(())
    }

    /// Leads stranded in flight by a previous process, older than the
    /// watcher deadline.
    pub async fn stalled_leads(&self, cutoff: DateTime<Utc>) -> Result<Vec<Lead>> {
        let leads = sqlx::query_as::<_, Lead>(
            "SELECT * FROM leads
             WHERE status IN ($1, $2)
               AND last_call_at IS NOT NULL
               AND last_call_at < $3
             ORDER BY id",
        )
        .bind(LeadStatus::Calling)
        .bind(LeadStatus::Called)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(leads)
    }

    /// How many leads of the campaign could still produce work: pending,
    /// in flight, or retryable with budget left. Zero means the campaign
    /// is finished.
    pub async fn remaining_lead_work(&self, campaign_id: i64, max_retries: i64) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM leads
             WHERE campaign_id = $1
               AND (
                     status IN ($2, $3, $4)
                  OR (status IN ($5, $6, $7) AND retries_attempted < $8)
               )",
        )
        .bind(campaign_id)
        .bind(LeadStatus::Pending)
        .bind(LeadStatus::Calling)
        .bind(LeadStatus::Called)
        .bind(LeadStatus::Failed)
        .bind(LeadStatus::Unreached)
        .bind(LeadStatus::Incomplete)
        .bind(max_retries)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn lead_status_counts(&self, campaign_id: i64) -> Result<Vec<LeadStatusCount>> {
        let counts = sqlx::query_as::<_, LeadStatusCount>(
            "SELECT status, COUNT(*) as count FROM leads
             WHERE campaign_id = $1
             GROUP BY status ORDER BY status",
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }

    pub async fn count_leads_with_status(&self, status: LeadStatus) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM leads WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database::NewCampaign;

    async fn db_with_campaign() -> (DatabaseManager, i64) {
        let db = DatabaseManager::new(&DatabaseConfig::default()).await.unwrap();
        let campaign = db
            .insert_campaign(&NewCampaign {
                name: "test".to_string(),
                max_retries: 3,
                retry_interval_secs: 60,
            })
            .await
            .unwrap();
        (db, campaign.id)
    }

    async fn seed_lead(db: &DatabaseManager, campaign_id: i64, phone: &str) -> Lead {
        db.insert_leads(
            campaign_id,
            &[NewLead {
                phone_number: phone.to_string(),
                display_name: "Test".to_string(),
            }],
        )
        .await
        .unwrap();
        let leads = db.leads_for_campaign(campaign_id).await.unwrap();
        leads.into_iter().last().unwrap()
    }

    #[tokio::test]
    async fn pending_leads_are_selected_oldest_first() {
        let (db, campaign_id) = db_with_campaign().await;
        let first = seed_lead(&db, campaign_id, "+100").await;
        seed_lead(&db, campaign_id, "+200").await;

        let selected = db.next_pending_lead(campaign_id).await.unwrap().unwrap();
        assert_eq!(selected.id, first.id);
    }

    #[tokio::test]
    async fn claim_succeeds_exactly_once() {
        let (db, campaign_id) = db_with_campaign().await;
        let lead = seed_lead(&db, campaign_id, "+100").await;

        let now = Utc::now();
        assert!(db.claim_lead_for_dialing(lead.id, LeadStatus::Pending, now).await.unwrap());
        // Second claim observes a stale status and loses.
        assert!(!db.claim_lead_for_dialing(lead.id, LeadStatus::Pending, now).await.unwrap());

        let claimed = db.get_lead(lead.id).await.unwrap().unwrap();
        assert_eq!(claimed.status, LeadStatus::Calling);
        assert_eq!(claimed.retries_attempted, 1);
        assert!(claimed.last_call_at.is_some());
    }

    #[tokio::test]
    async fn retryable_selection_honors_budget_and_schedule() {
        let (db, campaign_id) = db_with_campaign().await;
        let lead = seed_lead(&db, campaign_id, "+100").await;
        let now = Utc::now();
        let past = now - chrono::Duration::seconds(30);

        // Eligible: failed, due, budget left.
        db.claim_lead_for_dialing(lead.id, LeadStatus::Pending, now).await.unwrap();
        db.apply_lead_outcome(lead.id, LeadStatus::Failed, Some(past)).await.unwrap();
        let selected = db.next_retryable_lead(campaign_id, 3, now).await.unwrap();
        assert_eq!(selected.unwrap().id, lead.id);

        // Not due yet.
        let future = now + chrono::Duration::seconds(300);
        db.apply_lead_outcome(lead.id, LeadStatus::Failed, Some(future)).await.unwrap();
        assert!(db.next_retryable_lead(campaign_id, 3, now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn budget_exhausted_leads_are_not_selected() {
        let (db, campaign_id) = db_with_campaign().await;
        let lead = seed_lead(&db, campaign_id, "+100").await;
        let now = Utc::now();
        let past = now - chrono::Duration::seconds(30);

        // Burn the whole budget of 2.
        for status in [LeadStatus::Pending, LeadStatus::Incomplete] {
            db.claim_lead_for_dialing(lead.id, status, now).await.unwrap();
            db.apply_lead_outcome(lead.id, LeadStatus::Incomplete, Some(past)).await.unwrap();
        }
        let lead = db.get_lead(lead.id).await.unwrap().unwrap();
        assert_eq!(lead.retries_attempted, 2);

        // retries_attempted == max_retries: schedule alone is not enough.
        assert!(db.next_retryable_lead(campaign_id, 2, now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejected_leads_are_never_selected() {
        let (db, campaign_id) = db_with_campaign().await;
        let lead = seed_lead(&db, campaign_id, "+100").await;
        let now = Utc::now();
        let past = now - chrono::Duration::seconds(30);

        db.claim_lead_for_dialing(lead.id, LeadStatus::Pending, now).await.unwrap();
        db.apply_lead_outcome(lead.id, LeadStatus::Rejected, Some(past)).await.unwrap();

        assert!(db.next_pending_lead(campaign_id).await.unwrap().is_none());
        assert!(db.next_retryable_lead(campaign_id, 99, now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stalled_leads_are_found_past_the_cutoff() {
        let (db, campaign_id) = db_with_campaign().await;
        let lead = seed_lead(&db, campaign_id, "+100").await;
        let long_ago = Utc::now() - chrono::Duration::seconds(3600);

        db.claim_lead_for_dialing(lead.id, LeadStatus::Pending, long_ago).await.unwrap();

        let cutoff = Utc::now() - chrono::Duration::seconds(600);
        let stalled = db.stalled_leads(cutoff).await.unwrap();
        assert_eq!(stalled.len(), 1);
        assert_eq!(stalled[0].id, lead.id);

        // A fresh in-flight lead is left alone.
        let fresh_cutoff = long_ago - chrono::Duration::seconds(600);
        assert!(db.stalled_leads(fresh_cutoff).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remaining_work_reaches_zero_when_everything_is_terminal() {
        let (db, campaign_id) = db_with_campaign().await;
        let lead = seed_lead(&db, campaign_id, "+100").await;
        assert_eq!(db.remaining_lead_work(campaign_id, 3).await.unwrap(), 1);

        let now = Utc::now();
        db.claim_lead_for_dialing(lead.id, LeadStatus::Pending, now).await.unwrap();
        db.apply_lead_outcome(lead.id, LeadStatus::Completed, None).await.unwrap();
        assert_eq!(db.remaining_lead_work(campaign_id, 3).await.unwrap(), 0);

        // A failed lead with budget left counts as remaining work...
        let retry = seed_lead(&db, campaign_id, "+200").await;
        db.claim_lead_for_dialing(retry.id, LeadStatus::Pending, now).await.unwrap();
        db.apply_lead_outcome(retry.id, LeadStatus::Failed, Some(now)).await.unwrap();
        assert_eq!(db.remaining_lead_work(campaign_id, 3).await.unwrap(), 1);

        // ...but not once the budget is gone.
        assert_eq!(db.remaining_lead_work(campaign_id, 1).await.unwrap(), 0);
    }
}
