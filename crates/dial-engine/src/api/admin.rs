//! Administrative operations for campaign setup

use std::sync::Arc;

use tracing::info;

use crate::database::{Campaign, CampaignStatus, Lead, NewCampaign, NewLead};
use crate::error::{DialerError, Result};
use crate::orchestrator::DialerEngine;

/// Campaign and lead administration.
#[derive(Clone)]
pub struct AdminApi {
    engine: Arc<DialerEngine>,
}

impl AdminApi {
    pub fn new(engine: Arc<DialerEngine>) -> Self {
        Self { engine }
    }

    /// Create a campaign together with its leads. The campaign starts
    /// `pending`; nothing is dialed until it is activated.
    pub async fn create_campaign(
        &self,
        params: NewCampaign,
        leads: Vec<NewLead>,
    ) -> Result<Campaign> {
        if leads.iter().any(|lead| lead.phone_number.trim().is_empty()) {
            return Err(DialerError::Configuration(
                "every lead needs a phone number".to_string(),
            ));
        }

        let campaign = self.engine.database().insert_campaign(&params).await?;
        let inserted = self.engine.database().insert_leads(campaign.id, &leads).await?;
        info!(
            "📋 Campaign {} ({}) created with {} leads",
            campaign.id, campaign.name, inserted
        );
        Ok(campaign)
    }

    /// Open the campaign to the dispatch loop.
    pub async fn activate_campaign(&self, id: i64) -> Result<()> {
        self.set_campaign_status(id, CampaignStatus::Active).await
    }

    /// Take the campaign out of rotation; in-flight attempts finish
    /// normally.
    pub async fn pause_campaign(&self, id: i64) -> Result<()> {
        self.set_campaign_status(id, CampaignStatus::Paused).await
    }

    pub async fn set_campaign_status(&self, id: i64, status: CampaignStatus) -> Result<()> {
        self.engine.database().update_campaign_status(id, status).await?;
        info!("Campaign {id} set to {status:?}");
        Ok(())
    }

    /// Remove the campaign and its leads. Call records are kept; they are
    /// the survey results.
    pub async fn delete_campaign(&self, id: i64) -> Result<()> {
        self.engine.database().delete_campaign(id).await
    }

    pub async fn list_campaigns(&self) -> Result<Vec<Campaign>> {
        self.engine.database().list_campaigns().await
    }

    pub async fn campaign_leads(&self, campaign_id: i64) -> Result<Vec<Lead>> {
        self.engine.database().leads_for_campaign(campaign_id).await
    }
}
