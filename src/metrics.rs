//! Metrics Aggregator: append-only time series of operational and business
//! figures. The current value of a metric is its most recent sample.

use bigdecimal::ToPrimitive;
use chrono::{DateTime, Duration, Utc};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use sqlx::{SqliteConnection, SqlitePool};

use crate::clients;
use crate::errors::AppError;
use crate::leads;
use crate::models::{percentage, BusinessSnapshot, Metric};

pub struct MetricsAggregator {
    pool: SqlitePool,
}

impl MetricsAggregator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, metric_type: &str, value: f64) -> Result<Metric, AppError> {
        self.record_at(metric_type, value, Utc::now()).await
    }

    pub async fn record_at(
        &self,
        metric_type: &str,
        value: f64,
        at: DateTime<Utc>,
    ) -> Result<Metric, AppError> {
        let mut tx = self.pool.begin().await?;
        let metric = insert_sample(&mut tx, metric_type, value, at).await?;
        tx.commit().await?;

        tracing::debug!(metric_type, value, recorded_at = %at, "Metric recorded");
        Ok(metric)
    }

    /// Most recent sample of `metric_type`; later inserts win ties.
    pub async fn latest(&self, metric_type: &str) -> Result<Option<Metric>, AppError> {
        let metric = sqlx::query_as::<_, Metric>(
            r#"
            SELECT * FROM system_metrics
            WHERE metric_type = ?
            ORDER BY recorded_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(metric_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(metric)
    }

    /// Samples of `metric_type` with `from <= recorded_at <= to`, oldest first.
    pub fn series(
        &self,
        metric_type: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> BoxStream<'_, Result<Metric, AppError>> {
        sqlx::query_as::<_, Metric>(
            r#"
            SELECT * FROM system_metrics
            WHERE metric_type = ? AND recorded_at >= ? AND recorded_at <= ?
            ORDER BY recorded_at ASC, id ASC
            "#,
        )
        .bind(metric_type.to_string())
        .bind(from)
        .bind(to)
        .fetch(&self.pool)
        .map_err(AppError::from)
        .boxed()
    }

    /// Derives lead, outreach and revenue figures over the trailing `window`
    /// and appends them as one batch of samples sharing a timestamp.
    pub async fn snapshot(
        &self,
        window: Duration,
        revenue_target: f64,
    ) -> Result<BusinessSnapshot, AppError> {
        let now = Utc::now();
        let since = now - window;

        let mut tx = self.pool.begin().await?;

        let quality = leads::quality_stats(&mut tx, since).await?;
        let (emails_sent, emails_attempted) = outreach_counts(&mut tx, since).await?;
        let (active_clients, revenue) = clients::active_revenue(&mut tx).await?;
        let revenue_current = revenue.to_f64().unwrap_or(0.0);

        let snapshot = BusinessSnapshot {
            recorded_at: now,
            leads_generated: quality.total,
            leads_qualified: quality.qualified,
            leads_converted: quality.converted,
            conversion_rate: quality.conversion_rate(),
            emails_sent,
            email_success_rate: percentage(emails_sent, emails_attempted),
            active_clients,
            revenue_current,
            revenue_progress: if revenue_target > 0.0 {
                revenue_current / revenue_target * 100.0
            } else {
                0.0
            },
        };

        for (metric_type, value) in snapshot.samples() {
            insert_sample(&mut tx, metric_type, value, now).await?;
        }

        tx.commit().await?;

        tracing::info!(
            leads_generated = snapshot.leads_generated,
            emails_sent = snapshot.emails_sent,
            conversion_rate = snapshot.conversion_rate,
            revenue_current = snapshot.revenue_current,
            revenue_progress = snapshot.revenue_progress,
            "Business snapshot recorded"
        );
        if quality.total > 0 && quality.average_score < 5.0 {
            tracing::warn!(average_score = quality.average_score, "Low average lead score");
        }

        Ok(snapshot)
    }
}

async fn insert_sample(
    conn: &mut SqliteConnection,
    metric_type: &str,
    value: f64,
    at: DateTime<Utc>,
) -> Result<Metric, AppError> {
    let metric_type = metric_type.trim();
    if metric_type.is_empty() {
        return Err(AppError::Validation("metric_type is required".to_string()));
    }
    if !value.is_finite() {
        return Err(AppError::Validation(format!(
            "metric {} must be a finite number, got {}",
            metric_type, value
        )));
    }

    let metric = sqlx::query_as::<_, Metric>(
        r#"
        INSERT INTO system_metrics (metric_type, metric_value, recorded_at)
        VALUES (?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(metric_type)
    .bind(value)
    .bind(at)
    .fetch_one(&mut *conn)
    .await?;

    Ok(metric)
}

/// `(sent, attempted)` outreach counts since `since`.
async fn outreach_counts(
    conn: &mut SqliteConnection,
    since: DateTime<Utc>,
) -> Result<(i64, i64), AppError> {
    let (sent, attempted): (Option<i64>, i64) = sqlx::query_as(
        r#"
        SELECT SUM(CASE WHEN status = 'sent' THEN 1 ELSE 0 END), COUNT(*)
        FROM outreach_log
        WHERE created_at >= ?
        "#,
    )
    .bind(since)
    .fetch_one(&mut *conn)
    .await?;

    Ok((sent.unwrap_or(0), attempted))
}
