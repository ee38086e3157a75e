//! The dispatch loop: one lead at a time, continuously
//!
//! Ordering inside an attempt is load-bearing: the lead is claimed and the
//! call record exists *before* anything touches the control plane, so a
//! crash between launch and watch leaves a recoverable trail instead of an
//! orphaned session.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::OwnedSemaphorePermit;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::database::{Campaign, CallRecordStatus, Lead};
use crate::error::{DialerError, Result};
use crate::orchestrator::core::DialerEngine;
use crate::orchestrator::retry::RetryPolicy;

/// The single-flight token. Holding one is the precondition for dialing;
/// it is acquired per attempt and released when the attempt resolves.
pub(crate) struct DialPermit {
    _permit: OwnedSemaphorePermit,
}

impl DialerEngine {
    /// Run the dispatch loop until cancelled. Never returns on per-lead or
    /// per-iteration errors; those are logged and paced out.
    pub async fn run_dispatch_loop(self: Arc<Self>, shutdown: CancellationToken) {
        info!("🚀 Campaign dispatch loop started");

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            match self.process_campaigns_once(&shutdown).await {
                Ok(true) => {}
                Ok(false) => {
                    // Nothing to do anywhere; idle briefly.
                    if self.pause(self.config.general.idle_wait, &shutdown).await.is_err() {
                        break;
                    }
                }
                Err(DialerError::Shutdown) => break,
                Err(e) => {
                    error!("⚠️ Dispatch iteration failed: {e}");
                    if self.pause(self.config.general.error_pause, &shutdown).await.is_err() {
                        break;
                    }
                }
            }
        }

        info!("🛑 Campaign dispatch loop stopped");
    }

    /// One pass over all active campaigns, at most one attempt per
    /// campaign. Returns whether any campaign yielded work.
    pub async fn process_campaigns_once(&self, shutdown: &CancellationToken) -> Result<bool> {
        let campaigns = self.database.active_campaigns().await?;
        let mut worked = false;

        for campaign in campaigns {
            if shutdown.is_cancelled() {
                return Err(DialerError::Shutdown);
            }

            let Some(lead) = self.select_next_lead(&campaign).await? else {
                self.finish_campaign_if_done(&campaign).await?;
                continue;
            };

            let permit = match self.dial_slot.clone().try_acquire_owned() {
                Ok(permit) => DialPermit { _permit: permit },
                Err(_) => {
                    // Another attempt is somehow still in flight; do not
                    // dial on top of it.
                    warn!("Dial slot busy, deferring campaign {}", campaign.id);
                    return Ok(worked);
                }
            };

            worked = true;
            if let Err(e) = self.process_lead(permit, &campaign, &lead, shutdown).await {
                match e {
                    DialerError::Shutdown => return Err(DialerError::Shutdown),
                    e => error!("⚠️ Attempt for lead {} failed: {e}", lead.id),
                }
            }

            // Let the trunk release resources before the next attempt.
            self.pause(self.config.general.cooldown, shutdown).await?;
        }

        Ok(worked)
    }

    /// Selection predicate: pending first, then due retryables with budget
    /// left. Rejected and exhausted leads never match.
    async fn select_next_lead(&self, campaign: &Campaign) -> Result<Option<Lead>> {
        if let Some(lead) = self.database.next_pending_lead(campaign.id).await? {
            return Ok(Some(lead));
        }
        self.database
            .next_retryable_lead(campaign.id, campaign.max_retries, Utc::now())
            .await
    }

    /// Drive one attempt end to end: claim, record, launch, watch,
    /// classify. Launch failures are classified here as `failed`; only
    /// store errors and shutdown propagate to the caller.
    async fn process_lead(
        &self,
        _permit: DialPermit,
        campaign: &Campaign,
        lead: &Lead,
        shutdown: &CancellationToken,
    ) -> Result<()> {
        let now = Utc::now();
        if !self
            .database
            .claim_lead_for_dialing(lead.id, lead.status, now)
            .await?
        {
            // Someone else won the claim; nothing to do.
            debug!("Lost claim on lead {}", lead.id);
            return Ok(());
        }
        let attempt_number = lead.retries_attempted + 1;

        let record = self
            .database
            .insert_call_record(&lead.phone_number, &lead.display_name)
            .await?;
        self.database.link_call_record(lead.id, record.id).await?;
        let session_name = record.session_name();

        info!(
            "📞 [Dispatch] Calling {} (lead {}, record {}, attempt {})",
            lead.phone_number, lead.id, record.id, attempt_number
        );

        let policy = RetryPolicy::for_campaign(campaign);
        match self
            .launcher
            .launch(&session_name, &lead.phone_number, &lead.display_name, shutdown)
            .await
        {
            Ok(()) => {
                self.database.mark_lead_called(lead.id).await?;
                let status = self
                    .watcher
                    .wait_for_outcome(record.id, &session_name, shutdown)
                    .await?;
                let outcome = policy.classify(status, attempt_number, Utc::now());
                self.database
                    .apply_lead_outcome(lead.id, outcome.lead_status, outcome.next_retry_at)
                    .await?;
                info!(
                    "✅ Lead {} resolved: record {:?} → lead {:?}{}",
                    lead.id,
                    status,
                    outcome.lead_status,
                    match outcome.next_retry_at {
                        Some(at) => format!(", retry at {at}"),
                        None => String::new(),
                    }
                );
            }
            Err(DialerError::Shutdown) => return Err(DialerError::Shutdown),
            Err(e) => {
                warn!("❌ Launch failed for {}: {e}", lead.phone_number);
                self.database
                    .mark_record_synthesized(record.id, CallRecordStatus::Failed)
                    .await?;
                let outcome = policy.classify(CallRecordStatus::Failed, attempt_number, Utc::now());
                self.database
                    .apply_lead_outcome(lead.id, outcome.lead_status, outcome.next_retry_at)
                    .await?;
            }
        }

        // Best effort: free the trunk if the session outlived the
        // classification (timeout path leaves it up).
        if let Err(e) = self.telephony.delete_session(&session_name).await {
            debug!("Session {session_name} cleanup failed: {e}");
        }

        Ok(())
    }

    /// Mark a campaign done once no lead can ever produce work again.
    async fn finish_campaign_if_done(&self, campaign: &Campaign) -> Result<()> {
        let remaining = self
            .database
            .remaining_lead_work(campaign.id, campaign.max_retries)
            .await?;
        if remaining == 0 {
            self.database
                .update_campaign_status(campaign.id, crate::database::CampaignStatus::Done)
                .await?;
            info!("🏁 Campaign {} ({}) finished", campaign.id, campaign.name);
        }
        Ok(())
    }

    /// Cancellation-aware sleep used at every suspension point.
    async fn pause(&self, duration: Duration, shutdown: &CancellationToken) -> Result<()> {
        if duration.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = shutdown.cancelled() => Err(DialerError::Shutdown),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
