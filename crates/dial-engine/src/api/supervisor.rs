//! Monitoring surface: aggregates and recent results

use std::sync::Arc;

use serde::Serialize;

use crate::database::{CallRecord, LeadStatus, LeadStatusCount};
use crate::error::Result;
use crate::orchestrator::DialerEngine;

/// Raw aggregates over all campaigns; presentation is someone else's job.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_calls: i64,
    pub completed_calls: i64,
    pub pending_leads: i64,
    pub avg_score_sales_rep: Option<f64>,
    pub avg_score_installer: Option<f64>,
    pub avg_score_speed: Option<f64>,
    /// Mean of whichever score averages exist.
    pub avg_score_overall: Option<f64>,
}

/// Read-only monitoring over the engine.
#[derive(Clone)]
pub struct SupervisorApi {
    engine: Arc<DialerEngine>,
}

impl SupervisorApi {
    pub fn new(engine: Arc<DialerEngine>) -> Self {
        Self { engine }
    }

    pub async fn get_stats(&self) -> Result<DashboardStats> {
        let records = self.engine.database().record_stats().await?;
        let pending_leads = self
            .engine
            .database()
            .count_leads_with_status(LeadStatus::Pending)
            .await?;

        let present: Vec<f64> = [records.avg_sales_rep, records.avg_installer, records.avg_speed]
            .into_iter()
            .flatten()
            .collect();
        let avg_score_overall = if present.is_empty() {
            None
        } else {
            Some(present.iter().sum::<f64>() / present.len() as f64)
        };

        Ok(DashboardStats {
            total_calls: records.total,
            completed_calls: records.completed,
            pending_leads,
            avg_score_sales_rep: records.avg_sales_rep,
            avg_score_installer: records.avg_installer,
            avg_score_speed: records.avg_speed,
            avg_score_overall,
        })
    }

    /// Latest call records, newest first.
    pub async fn recent_calls(&self, limit: i64) -> Result<Vec<CallRecord>> {
        self.engine.database().recent_call_records(limit).await
    }

    /// Per-status lead counts for one campaign.
    pub async fn campaign_breakdown(&self, campaign_id: i64) -> Result<Vec<LeadStatusCount>> {
        self.engine.database().lead_status_counts(campaign_id).await
    }
}
