//! Follow-up Scheduler.
//!
//! Each follow-up moves `scheduled -> sent | cancelled | failed` exactly once.
//! What still needs to go out is a pure query over status and date, see
//! [`FollowUpScheduler::due_follow_ups`].

use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use sqlx::{SqliteConnection, SqlitePool};

use crate::errors::{AppError, ResultExt};
use crate::leads;
use crate::models::{FollowUp, FollowUpStatus, NewFollowUp, Recorded};

pub struct FollowUpScheduler {
    pool: SqlitePool,
}

impl FollowUpScheduler {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Plans a follow-up. `scheduled_date` must not be earlier than now.
    pub async fn schedule(&self, new: NewFollowUp) -> Result<Recorded<FollowUp>, AppError> {
        let now = Utc::now();
        if new.scheduled_date < now {
            return Err(AppError::InvalidSchedule(format!(
                "scheduled_date {} is before {}",
                new.scheduled_date, now
            )));
        }
        self.insert(new, now).await
    }

    /// Plans a follow-up without the past-date check, for imports and
    /// corrections. The follow-up is due immediately if its date has passed.
    pub async fn schedule_backdated(
        &self,
        new: NewFollowUp,
    ) -> Result<Recorded<FollowUp>, AppError> {
        let now = Utc::now();
        if new.scheduled_date < now {
            tracing::warn!(
                lead_id = %new.lead_id,
                scheduled_date = %new.scheduled_date,
                "Scheduling follow-up in the past"
            );
        }
        self.insert(new, now).await
    }

    async fn insert(
        &self,
        new: NewFollowUp,
        now: DateTime<Utc>,
    ) -> Result<Recorded<FollowUp>, AppError> {
        if new.follow_up_type.trim().is_empty() {
            return Err(AppError::Validation("follow_up_type is required".to_string()));
        }

        let mut tx = self.pool.begin().await?;

        let lead_exists = leads::lead_exists(&mut tx, &new.lead_id).await?;
        if !lead_exists {
            tracing::warn!(
                lead_id = %new.lead_id,
                "Follow-up scheduled for unknown lead; keeping orphaned reference"
            );
        }

        let follow_up = sqlx::query_as::<_, FollowUp>(
            r#"
            INSERT INTO follow_up_schedule (
                lead_id, follow_up_type, scheduled_date, subject, template,
                status, sent_at, failure_reason, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, NULL, NULL, ?)
            RETURNING *
            "#,
        )
        .bind(&new.lead_id)
        .bind(new.follow_up_type.trim())
        .bind(new.scheduled_date)
        .bind(&new.subject)
        .bind(&new.template)
        .bind(FollowUpStatus::Scheduled)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            follow_up_id = follow_up.id,
            lead_id = %follow_up.lead_id,
            scheduled_date = %follow_up.scheduled_date,
            "Follow-up scheduled"
        );

        Ok(Recorded {
            record: follow_up,
            lead_exists,
        })
    }

    pub async fn get(&self, id: i64) -> Result<FollowUp, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_follow_up(&mut conn, id).await
    }

    /// All follow-ups for a lead regardless of status, by scheduled date.
    pub async fn for_lead(&self, lead_id: &str) -> Result<Vec<FollowUp>, AppError> {
        let follow_ups = sqlx::query_as::<_, FollowUp>(
            "SELECT * FROM follow_up_schedule WHERE lead_id = ? ORDER BY scheduled_date ASC, id ASC",
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(follow_ups)
    }

    /// The send queue: scheduled follow-ups dated at or before `as_of`,
    /// earliest first.
    pub fn due_follow_ups(&self, as_of: DateTime<Utc>) -> BoxStream<'_, Result<FollowUp, AppError>> {
        sqlx::query_as::<_, FollowUp>(
            r#"
            SELECT * FROM follow_up_schedule
            WHERE status = 'scheduled' AND scheduled_date <= ?
            ORDER BY scheduled_date ASC, id ASC
            "#,
        )
        .bind(as_of)
        .fetch(&self.pool)
        .map_err(AppError::from)
        .boxed()
    }

    /// `scheduled -> sent`. Also stamps the lead's `last_contacted` in the same
    /// transaction when the lead exists.
    pub async fn mark_sent(&self, id: i64, sent_at: DateTime<Utc>) -> Result<FollowUp, AppError> {
        let mut tx = self.pool.begin().await?;

        let follow_up = transition(&mut tx, id, FollowUpStatus::Sent, Some(sent_at), None).await?;

        let stamped = sqlx::query("UPDATE leads SET last_contacted = ? WHERE id = ?")
            .bind(sent_at)
            .bind(&follow_up.lead_id)
            .execute(&mut *tx)
            .await?;
        if stamped.rows_affected() == 0 {
            tracing::warn!(
                follow_up_id = id,
                lead_id = %follow_up.lead_id,
                "Follow-up sent for unknown lead; no last_contacted to stamp"
            );
        }

        tx.commit().await?;

        tracing::info!(follow_up_id = id, lead_id = %follow_up.lead_id, "Follow-up sent");
        Ok(follow_up)
    }

    /// `scheduled -> failed`, keeping the reason.
    pub async fn mark_failed(&self, id: i64, reason: &str) -> Result<FollowUp, AppError> {
        let mut tx = self.pool.begin().await?;
        let follow_up =
            transition(&mut tx, id, FollowUpStatus::Failed, None, Some(reason)).await?;
        tx.commit().await?;

        tracing::warn!(follow_up_id = id, lead_id = %follow_up.lead_id, reason, "Follow-up failed");
        Ok(follow_up)
    }

    /// `scheduled -> cancelled`.
    pub async fn cancel(&self, id: i64) -> Result<FollowUp, AppError> {
        let mut tx = self.pool.begin().await?;
        let follow_up = transition(&mut tx, id, FollowUpStatus::Cancelled, None, None).await?;
        tx.commit().await?;

        tracing::info!(follow_up_id = id, lead_id = %follow_up.lead_id, "Follow-up cancelled");
        Ok(follow_up)
    }
}

async fn fetch_follow_up(conn: &mut SqliteConnection, id: i64) -> Result<FollowUp, AppError> {
    sqlx::query_as::<_, FollowUp>("SELECT * FROM follow_up_schedule WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("follow-up {}", id)))
}

/// Moves a follow-up out of `scheduled`. The status guard lives in the UPDATE
/// itself so a terminal record can never be rewritten.
async fn transition(
    conn: &mut SqliteConnection,
    id: i64,
    to: FollowUpStatus,
    sent_at: Option<DateTime<Utc>>,
    reason: Option<&str>,
) -> Result<FollowUp, AppError> {
    let updated = sqlx::query_as::<_, FollowUp>(
        r#"
        UPDATE follow_up_schedule
        SET status = ?, sent_at = ?, failure_reason = ?
        WHERE id = ? AND status = 'scheduled'
        RETURNING *
        "#,
    )
    .bind(to)
    .bind(sent_at)
    .bind(reason)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .with_context(|| format!("moving follow-up {} to {}", id, to.as_str()))?;

    match updated {
        Some(follow_up) => Ok(follow_up),
        None => {
            let current = fetch_follow_up(conn, id).await?;
            Err(AppError::InvalidTransition {
                id,
                from: current.status,
                to,
            })
        }
    }
}
