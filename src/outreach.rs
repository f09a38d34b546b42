//! Outreach Log: append-only record of every campaign touch.
//!
//! Appends never fail because of the lead they reference. An unknown lead id
//! is logged at warn level and reported back through `Recorded::lead_exists`.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::errors::AppError;
use crate::leads;
use crate::models::{
    CampaignSummary, CampaignType, OutreachRecord, OutreachStatus, Recorded, TypePerformance,
};

pub struct OutreachLog {
    pool: SqlitePool,
}

impl OutreachLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record_send(
        &self,
        lead_id: &str,
        campaign_id: &str,
        campaign_type: CampaignType,
    ) -> Result<Recorded<OutreachRecord>, AppError> {
        self.append(lead_id, campaign_id, campaign_type, OutreachStatus::Sent, None)
            .await
    }

    /// Failure-reporting sink for a send the caller could not complete.
    pub async fn record_failure(
        &self,
        lead_id: &str,
        campaign_id: &str,
        campaign_type: CampaignType,
        error_message: &str,
    ) -> Result<Recorded<OutreachRecord>, AppError> {
        self.append(
            lead_id,
            campaign_id,
            campaign_type,
            OutreachStatus::Failed,
            Some(error_message),
        )
        .await
    }

    pub async fn record_bounce(
        &self,
        lead_id: &str,
        campaign_id: &str,
        campaign_type: CampaignType,
        error_message: &str,
    ) -> Result<Recorded<OutreachRecord>, AppError> {
        self.append(
            lead_id,
            campaign_id,
            campaign_type,
            OutreachStatus::Bounced,
            Some(error_message),
        )
        .await
    }

    async fn append(
        &self,
        lead_id: &str,
        campaign_id: &str,
        campaign_type: CampaignType,
        status: OutreachStatus,
        error_message: Option<&str>,
    ) -> Result<Recorded<OutreachRecord>, AppError> {
        if campaign_id.trim().is_empty() {
            return Err(AppError::Validation("campaign_id is required".to_string()));
        }

        let mut tx = self.pool.begin().await?;

        let lead_exists = leads::lead_exists(&mut tx, lead_id).await?;
        if !lead_exists {
            tracing::warn!(
                lead_id,
                campaign_id,
                "Outreach recorded for unknown lead; keeping orphaned reference"
            );
        }

        let record = sqlx::query_as::<_, OutreachRecord>(
            r#"
            INSERT INTO outreach_log (lead_id, campaign_id, campaign_type, status, error_message, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(campaign_id)
        .bind(campaign_type)
        .bind(status)
        .bind(error_message)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        match status {
            OutreachStatus::Sent => tracing::info!(
                lead_id,
                campaign_id,
                campaign_type = campaign_type.as_str(),
                "Outreach sent"
            ),
            _ => tracing::warn!(
                lead_id,
                campaign_id,
                campaign_type = campaign_type.as_str(),
                status = status.as_str(),
                error = error_message.unwrap_or(""),
                "Outreach not delivered"
            ),
        }

        Ok(Recorded {
            record,
            lead_exists,
        })
    }

    /// Sent/failed/bounced counts for one campaign. Unknown campaigns yield zeros.
    pub async fn campaign_summary(&self, campaign_id: &str) -> Result<CampaignSummary, AppError> {
        let (sent, failed, bounced): (Option<i64>, Option<i64>, Option<i64>) = sqlx::query_as(
            r#"
            SELECT
                SUM(CASE WHEN status = 'sent' THEN 1 ELSE 0 END),
                SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END),
                SUM(CASE WHEN status = 'bounced' THEN 1 ELSE 0 END)
            FROM outreach_log
            WHERE campaign_id = ?
            "#,
        )
        .bind(campaign_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(CampaignSummary {
            sent: sent.unwrap_or(0),
            failed: failed.unwrap_or(0),
            bounced: bounced.unwrap_or(0),
        })
    }

    /// Every outreach attempt against a lead, oldest first.
    pub async fn history_for_lead(&self, lead_id: &str) -> Result<Vec<OutreachRecord>, AppError> {
        let records = sqlx::query_as::<_, OutreachRecord>(
            "SELECT * FROM outreach_log WHERE lead_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Per campaign type outcome counts for attempts made at or after `since`.
    pub async fn type_performance(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<TypePerformance>, AppError> {
        let rows: Vec<(CampaignType, i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT
                campaign_type,
                SUM(CASE WHEN status = 'sent' THEN 1 ELSE 0 END),
                SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END),
                SUM(CASE WHEN status = 'bounced' THEN 1 ELSE 0 END)
            FROM outreach_log
            WHERE created_at >= ?
            GROUP BY campaign_type
            ORDER BY campaign_type
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        let performance = rows
            .into_iter()
            .map(|(campaign_type, sent, failed, bounced)| {
                let summary = CampaignSummary {
                    sent,
                    failed,
                    bounced,
                };
                if summary.success_rate() < 70.0 {
                    tracing::warn!(
                        campaign_type = campaign_type.as_str(),
                        success_rate = summary.success_rate(),
                        "Low outreach success rate"
                    );
                }
                TypePerformance {
                    campaign_type,
                    summary,
                }
            })
            .collect();

        Ok(performance)
    }
}
