//! Call record persistence and the shared survey write-path
//!
//! Call records are created here as `initiated` and then belong to the
//! remote conversational agent. [`DatabaseManager::apply_survey_update`]
//! is the store-side contract of that agent's bridge: incremental partial
//! writes, an inferred `incomplete` when data arrives without a status,
//! and no downgrading of records that already finished. The orchestrator
//! only writes synthesized outcomes, and only while a record is still
//! `initiated`.

use chrono::Utc;
use tracing::debug;

use super::{CallRecord, CallRecordStatus, DatabaseManager};
use crate::error::{DialerError, Result};

/// Incremental survey data as the remote agent reports it.
#[derive(Debug, Clone, Default)]
pub struct SurveyUpdate {
    /// Explicit terminal status; absent while answers trickle in.
    pub status: Option<CallRecordStatus>,
    pub score_sales_rep: Option<i64>,
    pub score_installer: Option<i64>,
    pub score_speed: Option<i64>,
    pub comment: Option<String>,
    pub transcript: Option<String>,
    pub duration_secs: Option<i64>,
}

impl SurveyUpdate {
    fn has_data(&self) -> bool {
        self.score_sales_rep.is_some()
            || self.score_installer.is_some()
            || self.score_speed.is_some()
            || self.comment.is_some()
            || self.transcript.is_some()
            || self.duration_secs.is_some()
    }
}

/// Survey scores are 1-10; anything else is treated as noise from the
/// transcription layer and dropped.
fn clean_score(value: Option<i64>) -> Option<i64> {
    value.filter(|v| (1..=10).contains(v))
}

/// Aggregates over all call records, for the supervisor surface.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecordStats {
    pub total: i64,
    pub completed: i64,
    pub avg_sales_rep: Option<f64>,
    pub avg_installer: Option<f64>,
    pub avg_speed: Option<f64>,
}

impl DatabaseManager {
    /// Create the record for a new attempt, before anything is dialed.
    pub async fn insert_call_record(&self, phone_number: &str, contact_name: &str) -> Result<CallRecord> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO call_records (phone_number, contact_name, status, completed, created_at, updated_at)
             VALUES ($1, $2, $3, 0, $4, $5)",
        )
        .bind(phone_number)
        .bind(contact_name)
        .bind(CallRecordStatus::Initiated)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_call_record(id)
            .await?
            .ok_or_else(|| DialerError::Internal(format!("call record {id} vanished after insert")))
    }

    pub async fn get_call_record(&self, id: i64) -> Result<Option<CallRecord>> {
        let record = sqlx::query_as::<_, CallRecord>("SELECT * FROM call_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// Synthesized-status write-back. Fires only while the record is still
    /// `initiated`; an agent-written terminal status always wins. Returns
    /// whether the write happened.
    pub async fn mark_record_synthesized(
        &self,
        id: i64,
        status: CallRecordStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE call_records SET status = $1, updated_at = $2
             WHERE id = $3 AND status = $4",
        )
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .bind(CallRecordStatus::Initiated)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The agent bridge's write path: partial survey data and, eventually,
    /// a terminal status. Returns whether anything changed.
    pub async fn apply_survey_update(&self, id: i64, update: &SurveyUpdate) -> Result<bool> {
        let Some(current) = self.get_call_record(id).await? else {
            return Err(DialerError::NotFound(format!("call record {id}")));
        };

        let score_sales_rep = clean_score(update.score_sales_rep).or(current.score_sales_rep);
        let score_installer = clean_score(update.score_installer).or(current.score_installer);
        let score_speed = clean_score(update.score_speed).or(current.score_speed);
        let comment = update.comment.clone().or(current.comment.clone());
        let transcript = update.transcript.clone().or(current.transcript.clone());
        let duration_secs = update.duration_secs.or(current.duration_secs);

        let already_finished = matches!(
            current.status,
            CallRecordStatus::Completed | CallRecordStatus::Rejected
        );

        let (status, completed) = match update.status {
            // An explicit status from the agent is always respected.
            Some(status) => (status, status == CallRecordStatus::Completed),
            // Partial data without a status means the survey is underway;
            // never demote a record that already finished.
            None if update.has_data() && !already_finished => {
                (CallRecordStatus::Incomplete, current.completed)
            }
            None => (current.status, current.completed),
        };

        if update.status.is_none() && !update.has_data() {
            debug!("Survey update for record {id} carried no data, ignoring");
            return Ok(false);
        }

        sqlx::query(
            "UPDATE call_records
             SET status = $1, completed = $2,
                 score_sales_rep = $3, score_installer = $4, score_speed = $5,
                 comment = $6, transcript = $7, duration_secs = $8,
                 updated_at = $9
             WHERE id = $10",
        )
        .bind(status)
        .bind(completed)
        .bind(score_sales_rep)
        .bind(score_installer)
        .bind(score_speed)
        .bind(comment)
        .bind(transcript)
        .bind(duration_secs)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(true)
    }

    pub async fn recent_call_records(&self, limit: i64) -> Result<Vec<CallRecord>> {
        let records = sqlx::query_as::<_, CallRecord>(
            "SELECT * FROM call_records ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    pub async fn record_stats(&self) -> Result<RecordStats> {
        let stats = sqlx::query_as::<_, RecordStats>(
            "SELECT COUNT(*) as total,
                    COALESCE(SUM(completed), 0) as completed,
                    AVG(score_sales_rep) as avg_sales_rep,
                    AVG(score_installer) as avg_installer,
                    AVG(score_speed) as avg_speed
             FROM call_records",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;

    async fn test_db() -> DatabaseManager {
        DatabaseManager::new(&DatabaseConfig::default()).await.unwrap()
    }

    #[tokio::test]
    async fn records_start_initiated_and_incomplete() {
        let db = test_db().await;
        let record = db.insert_call_record("+34600111222", "Alice").await.unwrap();
        assert_eq!(record.status, CallRecordStatus::Initiated);
        assert!(!record.completed);
        assert_eq!(record.session_name(), format!("survey_{}", record.id));
    }

    #[tokio::test]
    async fn synthesized_status_only_lands_on_initiated_records() {
        let db = test_db().await;
        let record = db.insert_call_record("+100", "A").await.unwrap();

        assert!(db.mark_record_synthesized(record.id, CallRecordStatus::Unreached).await.unwrap());
        let record = db.get_call_record(record.id).await.unwrap().unwrap();
        assert_eq!(record.status, CallRecordStatus::Unreached);

        // A second synthesis finds a terminal record and does nothing.
        assert!(!db.mark_record_synthesized(record.id, CallRecordStatus::Failed).await.unwrap());
    }

    #[tokio::test]
    async fn agent_terminal_status_is_never_overwritten_by_synthesis() {
        let db = test_db().await;
        let record = db.insert_call_record("+100", "A").await.unwrap();
        db.apply_survey_update(
            record.id,
            &SurveyUpdate {
                status: Some(CallRecordStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(!db.mark_record_synthesized(record.id, CallRecordStatus::Unreached).await.unwrap());
        let record = db.get_call_record(record.id).await.unwrap().unwrap();
        assert_eq!(record.status, CallRecordStatus::Completed);
        assert!(record.completed);
    }

    #[tokio::test]
    async fn partial_data_infers_incomplete() {
        let db = test_db().await;
        let record = db.insert_call_record("+100", "A").await.unwrap();

        db.apply_survey_update(
            record.id,
            &SurveyUpdate {
                score_sales_rep: Some(8),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let record = db.get_call_record(record.id).await.unwrap().unwrap();
        assert_eq!(record.status, CallRecordStatus::Incomplete);
        assert_eq!(record.score_sales_rep, Some(8));
        assert!(!record.completed);
    }

    #[tokio::test]
    async fn completed_records_are_not_demoted_by_late_partials() {
        let db = test_db().await;
        let record = db.insert_call_record("+100", "A").await.unwrap();

        db.apply_survey_update(
            record.id,
            &SurveyUpdate {
                status: Some(CallRecordStatus::Completed),
                score_sales_rep: Some(9),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        db.apply_survey_update(
            record.id,
            &SurveyUpdate {
                comment: Some("late comment".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let record = db.get_call_record(record.id).await.unwrap().unwrap();
        assert_eq!(record.status, CallRecordStatus::Completed);
        assert!(record.completed);
        assert_eq!(record.comment.as_deref(), Some("late comment"));
    }

    #[tokio::test]
    async fn out_of_range_scores_are_dropped() {
        let db = test_db().await;
        let record = db.insert_call_record("+100", "A").await.unwrap();

        db.apply_survey_update(
            record.id,
            &SurveyUpdate {
                score_sales_rep: Some(42),
                score_installer: Some(10),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let record = db.get_call_record(record.id).await.unwrap().unwrap();
        assert_eq!(record.score_sales_rep, None);
        assert_eq!(record.score_installer, Some(10));
    }

    #[tokio::test]
    async fn empty_updates_are_ignored() {
        let db = test_db().await;
        let record = db.insert_call_record("+100", "A").await.unwrap();
        let changed = db.apply_survey_update(record.id, &SurveyUpdate::default()).await.unwrap();
        assert!(!changed);
    }

    #[tokio::test]
    async fn stats_aggregate_scores_and_completion() {
        let db = test_db().await;
        let a = db.insert_call_record("+100", "A").await.unwrap();
        let b = db.insert_call_record("+200", "B").await.unwrap();

        db.apply_survey_update(
            a.id,
            &SurveyUpdate {
                status: Some(CallRecordStatus::Completed),
                score_sales_rep: Some(8),
                score_installer: Some(6),
                score_speed: Some(10),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        db.apply_survey_update(
            b.id,
            &SurveyUpdate {
                score_sales_rep: Some(4),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let stats = db.record_stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.avg_sales_rep, Some(6.0));
        assert_eq!(stats.avg_installer, Some(6.0));
        assert_eq!(stats.avg_speed, Some(10.0));
    }
}
