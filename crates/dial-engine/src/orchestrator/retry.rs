//! Terminal-status classification and retry scheduling

use chrono::{DateTime, Duration, Utc};

use crate::database::{Campaign, CallRecordStatus, LeadStatus};

/// What happens to a lead after its attempt reached a terminal status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadOutcome {
    pub lead_status: LeadStatus,
    /// When the lead becomes eligible again; `None` for statuses that are
    /// never retried or when the retry budget is spent.
    pub next_retry_at: Option<DateTime<Utc>>,
}

/// Per-campaign retry rules: how many attempts, and how far apart.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: i64,
    retry_interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: i64, retry_interval_secs: i64) -> Self {
        Self {
            max_retries,
            retry_interval: Duration::seconds(retry_interval_secs.max(0)),
        }
    }

    pub fn for_campaign(campaign: &Campaign) -> Self {
        Self::new(campaign.max_retries, campaign.retry_interval_secs)
    }

    /// Translate a terminal call record status into the lead's next state.
    ///
    /// `retries_attempted` is the lead's counter *after* the attempt being
    /// classified. Retryable statuses get a schedule while budget remains;
    /// at or past the budget the lead keeps its terminal status with no
    /// schedule, which permanently excludes it from selection.
    pub fn classify(
        &self,
        record_status: CallRecordStatus,
        retries_attempted: i64,
        now: DateTime<Utc>,
    ) -> LeadOutcome {
        match record_status {
            CallRecordStatus::Completed => LeadOutcome {
                lead_status: LeadStatus::Completed,
                next_retry_at: None,
            },
            // An explicit opt-out is final, whatever the budget says.
            CallRecordStatus::Rejected => LeadOutcome {
                lead_status: LeadStatus::Rejected,
                next_retry_at: None,
            },
            CallRecordStatus::Failed => self.retryable(LeadStatus::Failed, retries_attempted, now),
            CallRecordStatus::Incomplete => {
                self.retryable(LeadStatus::Incomplete, retries_attempted, now)
            }
            CallRecordStatus::Unreached => {
                self.retryable(LeadStatus::Unreached, retries_attempted, now)
            }
            // A record that never left `initiated` is an unanswered call.
            CallRecordStatus::Initiated => {
                self.retryable(LeadStatus::Unreached, retries_attempted, now)
            }
        }
    }

    fn retryable(&self, status: LeadStatus, retries_attempted: i64, now: DateTime<Utc>) -> LeadOutcome {
        let next_retry_at = if retries_attempted < self.max_retries {
            Some(now + self.retry_interval)
        } else {
            None
        };
        LeadOutcome {
            lead_status: status,
            next_retry_at,
        }
    }
}
