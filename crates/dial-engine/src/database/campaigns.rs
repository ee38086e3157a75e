//! Campaign persistence operations

use chrono::Utc;
use tracing::info;

use super::{Campaign, CampaignStatus, DatabaseManager};
use crate::error::{DialerError, Result};

/// Parameters for creating a campaign.
#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub name: String,
    pub max_retries: i64,
    /// Back-off between attempts, in whole seconds.
    pub retry_interval_secs: i64,
}

impl DatabaseManager {
    pub async fn insert_campaign(&self, params: &NewCampaign) -> Result<Campaign> {
        if params.max_retries < 0 {
            return Err(DialerError::Configuration(
                "max_retries must be non-negative".to_string(),
            ));
        }
        if params.retry_interval_secs < 0 {
            return Err(DialerError::Configuration(
                "retry_interval_secs must be non-negative".to_string(),
            ));
        }

        let result = sqlx::query(
            "INSERT INTO campaigns (name, status, max_retries, retry_interval_secs, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&params.name)
        .bind(CampaignStatus::Pending)
        .bind(params.max_retries)
        .bind(params.retry_interval_secs)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_campaign(id)
            .await?
            .ok_or_else(|| DialerError::Internal(format!("campaign {id} vanished after insert")))
    }

    pub async fn get_campaign(&self, id: i64) -> Result<Option<Campaign>> {
        let campaign = sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(campaign)
    }

    pub async fn list_campaigns(&self) -> Result<Vec<Campaign>> {
        let campaigns = sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(campaigns)
    }

    /// Campaigns the dispatch loop should work on, in stable id order.
    pub async fn active_campaigns(&self) -> Result<Vec<Campaign>> {
        let campaigns = sqlx::query_as::<_, Campaign>(
            "SELECT * FROM campaigns WHERE status = $1 ORDER BY id",
        )
        .bind(CampaignStatus::Active)
        .fetch_all(&self.pool)
        .await?;
        Ok(campaigns)
    }

    pub async fn update_campaign_status(&self, id: i64, status: CampaignStatus) -> Result<()> {
        let result = sqlx::query("UPDATE campaigns SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DialerError::NotFound(format!("campaign {id}")));
        }
        Ok(())
    }

    /// Remove a campaign and everything referencing it. Leads go first so
    /// the foreign key is never dangling.
    pub async fn delete_campaign(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM leads WHERE campaign_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM campaigns WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DialerError::NotFound(format!("campaign {id}")));
        }

        tx.commit().await?;
        info!("Deleted campaign {id} and its leads");
        Ok(())
    }
}
