//! Core DialerEngine structure and initialization

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use autodial_telephony_core::SessionControl;

use crate::config::DialerConfig;
use crate::database::{CallRecordStatus, DatabaseManager};
use crate::error::{DialerError, Result};
use crate::orchestrator::launcher::CallLauncher;
use crate::orchestrator::retry::RetryPolicy;
use crate::orchestrator::watcher::CompletionWatcher;

/// The engine behind the dispatch loop: configuration, the shared stores,
/// the control plane, and the single-flight dial permit.
pub struct DialerEngine {
    pub(crate) config: DialerConfig,
    pub(crate) database: DatabaseManager,
    pub(crate) telephony: Arc<dyn SessionControl>,
    pub(crate) launcher: CallLauncher,
    pub(crate) watcher: CompletionWatcher,
    /// One permit for the whole process: whoever holds it is the only
    /// attempt in flight.
    pub(crate) dial_slot: Arc<Semaphore>,
}

impl DialerEngine {
    pub async fn new(
        config: DialerConfig,
        telephony: Arc<dyn SessionControl>,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let database = DatabaseManager::new(&config.database).await?;
        let launcher = CallLauncher::new(&config.general, telephony.clone());
        let watcher =
            CompletionWatcher::new(config.watcher.clone(), database.clone(), telephony.clone());

        info!("🎛️ Dialer engine initialized");
        Ok(Arc::new(Self {
            config,
            database,
            telephony,
            launcher,
            watcher,
            dial_slot: Arc::new(Semaphore::new(1)),
        }))
    }

    pub fn config(&self) -> &DialerConfig {
        &self.config
    }

    pub fn database(&self) -> &DatabaseManager {
        &self.database
    }

    /// Re-admit leads stranded in flight by a previous process.
    ///
    /// Anything still `calling`/`called` with a `last_call_at` older than
    /// the watcher deadline can no longer have a live watch. If its record
    /// already holds a terminal status that classification is applied;
    /// otherwise the attempt counts as unreached, with the usual back-off.
    /// Returns how many leads were recovered.
    pub async fn recover_stalled_leads(&self) -> Result<u64> {
        let max_wait = ChronoDuration::from_std(self.config.watcher.max_wait)
            .map_err(|e| DialerError::Internal(format!("watcher.max_wait out of range: {e}")))?;
        let now = Utc::now();
        let stalled = self.database.stalled_leads(now - max_wait).await?;

        let mut recovered = 0u64;
        for lead in stalled {
            let Some(campaign) = self.database.get_campaign(lead.campaign_id).await? else {
                warn!("Stalled lead {} has no campaign, skipping", lead.id);
                continue;
            };

            let record_status = match lead.call_record_id {
                Some(record_id) => {
                    match self.database.get_call_record(record_id).await? {
                        Some(record) if record.status.is_terminal() => record.status,
                        Some(record) => {
                            // The agent never wrote an outcome; close the
                            // record out the same way the watcher would.
                            self.database
                                .mark_record_synthesized(record.id, CallRecordStatus::Unreached)
                                .await?;
                            CallRecordStatus::Unreached
                        }
                        None => CallRecordStatus::Unreached,
                    }
                }
                None => CallRecordStatus::Unreached,
            };

            let outcome = RetryPolicy::for_campaign(&campaign).classify(
                record_status,
                lead.retries_attempted,
                now,
            );
            self.database
                .apply_lead_outcome(lead.id, outcome.lead_status, outcome.next_retry_at)
                .await?;
            info!(
                "♻️ Recovered stalled lead {} as {:?}",
                lead.id, outcome.lead_status
            );
            recovered += 1;
        }

        Ok(recovered)
    }
}
