//! Debounced, polling completion detection
//!
//! There is no reliable completion callback from the control plane, so the
//! watcher polls two sources each tick: the call record (authoritative, the
//! remote agent writes it) and session existence (noisy, debounced). Every
//! watch resolves to a terminal status; the timeout and confirmed-gone
//! paths synthesize `unreached` rather than leaving a lead stuck in
//! `calling`.

use std::sync::Arc;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use autodial_telephony_core::SessionControl;

use crate::config::WatcherConfig;
use crate::database::{CallRecordStatus, DatabaseManager};
use crate::error::{DialerError, Result};

pub struct CompletionWatcher {
    settings: WatcherConfig,
    database: DatabaseManager,
    telephony: Arc<dyn SessionControl>,
}

impl CompletionWatcher {
    pub fn new(
        settings: WatcherConfig,
        database: DatabaseManager,
        telephony: Arc<dyn SessionControl>,
    ) -> Self {
        Self {
            settings,
            database,
            telephony,
        }
    }

    /// Block until the call resolves, then return its terminal status.
    ///
    /// Returns `Err(Shutdown)` only when cancelled; every other path
    /// produces a status, synthesizing `unreached` on timeout or once the
    /// session is confirmed gone while the record never left `initiated`.
    pub async fn wait_for_outcome(
        &self,
        record_id: i64,
        session_name: &str,
        shutdown: &CancellationToken,
    ) -> Result<CallRecordStatus> {
        let deadline = Instant::now() + self.settings.max_wait;
        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut gone_streak = 0u32;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Err(DialerError::Shutdown),
                _ = ticker.tick() => {}
            }

            // The record is authoritative: a terminal status ends the watch
            // no matter what the session looks like.
            match self.database.get_call_record(record_id).await {
                Ok(Some(record)) => {
                    if record.status.is_terminal() {
                        debug!("Record {record_id} reached {:?}", record.status);
                        return Ok(record.status);
                    }
                    if record.completed {
                        return Ok(CallRecordStatus::Completed);
                    }
                }
                Ok(None) => warn!("Call record {record_id} missing during watch"),
                // Transient store trouble: the pool reconnects on its own,
                // try again next tick.
                Err(e) => warn!("Store poll for record {record_id} failed: {e}"),
            }

            if Instant::now() >= deadline {
                info!("⏰ Watch for record {record_id} timed out, classifying as unreached");
                return self.synthesize_unreached(record_id).await;
            }

            match self.telephony.session_exists(session_name).await {
                Ok(true) => gone_streak = 0,
                Ok(false) => {
                    gone_streak += 1;
                    debug!("Session {session_name} gone ({gone_streak} consecutive)");
                    if gone_streak >= self.settings.gone_confirmations {
                        info!("📴 Session {session_name} confirmed gone");
                        return self.synthesize_unreached(record_id).await;
                    }
                }
                // A failed existence query says nothing about the session;
                // leave the streak as it is.
                Err(e) => debug!("Existence query for {session_name} failed: {e}"),
            }
        }
    }

    /// Resolve a watch without an agent-written outcome. If the agent got a
    /// terminal status in just under the wire, that wins; otherwise the
    /// record is stamped `unreached` so downstream readers see a consistent
    /// terminal state.
    async fn synthesize_unreached(&self, record_id: i64) -> Result<CallRecordStatus> {
        let wrote = self
            .database
            .mark_record_synthesized(record_id, CallRecordStatus::Unreached)
            .await?;
        if wrote {
            return Ok(CallRecordStatus::Unreached);
        }
        match self.database.get_call_record(record_id).await? {
            Some(record) if record.status.is_terminal() => Ok(record.status),
            _ => Ok(CallRecordStatus::Unreached),
        }
    }
}
