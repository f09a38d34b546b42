//! Lead Store: lead records and their scoring/status transitions.
//!
//! Leads are never deleted. Every write runs in its own transaction; the
//! score, status and priority of a lead always change together.

use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::errors::{AppError, ResultExt};
use crate::models::{Lead, LeadQualityStats, LeadStatus, NewLead, Priority};
use crate::scoring;

pub struct LeadStore {
    pool: SqlitePool,
}

impl LeadStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a lead if its id is not taken yet.
    ///
    /// Re-inserting the same descriptive fields under an existing id is a
    /// no-op that returns the stored lead untouched. Any other collision is a
    /// `DuplicateKey` error; the stored record is never overwritten.
    pub async fn create_lead(&self, new: NewLead) -> Result<Lead, AppError> {
        let new = normalize(new)?;
        let id = new
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (
                id, company_name, contact_email, contact_name, industry, size,
                location, lead_score, qualified_score, status, priority, source,
                last_contacted, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, NULL, ?, NULL, ?)
            ON CONFLICT (id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&new.company_name)
        .bind(&new.contact_email)
        .bind(&new.contact_name)
        .bind(&new.industry)
        .bind(&new.size)
        .bind(&new.location)
        .bind(new.lead_score.unwrap_or(0.0))
        .bind(LeadStatus::New)
        .bind(&new.source)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        let lead = match inserted {
            Some(lead) => {
                tracing::info!(lead_id = %lead.id, company = %lead.company_name, "Lead created");
                lead
            }
            None => {
                let existing = fetch_lead(&mut tx, &id).await?;
                if !same_payload(&existing, &new) {
                    return Err(AppError::DuplicateKey(format!(
                        "lead {} already exists with different data",
                        id
                    )));
                }
                tracing::debug!(lead_id = %id, "Lead already present, insert skipped");
                existing
            }
        };

        tx.commit().await?;
        Ok(lead)
    }

    pub async fn get_lead(&self, id: &str) -> Result<Lead, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_lead(&mut conn, id).await
    }

    /// Records a raw score and derives `qualified_score`, status and priority
    /// from it in one atomic update.
    pub async fn score_lead(&self, id: &str, lead_score: f64) -> Result<Lead, AppError> {
        let lead_score = scoring::validate_lead_score(lead_score)?;
        let qualified = scoring::qualified_score(lead_score);
        let status = scoring::tier_for(qualified);

        let mut tx = self.pool.begin().await?;
        let lead = set_status(&mut tx, id, status, Some((lead_score, qualified))).await?;
        tx.commit().await?;

        tracing::info!(
            lead_id = %id,
            lead_score,
            qualified_score = qualified,
            status = status.as_str(),
            "Lead scored"
        );
        Ok(lead)
    }

    /// Explicit status override that bypasses score derivation.
    ///
    /// A `Qualified*` status is only accepted when it is the tier the stored
    /// `qualified_score` already falls into; re-tiering goes through
    /// [`LeadStore::score_lead`].
    pub async fn update_status(&self, id: &str, status: LeadStatus) -> Result<Lead, AppError> {
        let mut tx = self.pool.begin().await?;
        let lead = set_status(&mut tx, id, status, None).await?;
        tx.commit().await?;

        tracing::info!(lead_id = %id, status = status.as_str(), "Lead status updated");
        Ok(lead)
    }

    /// Stamps `last_contacted` without touching status.
    pub async fn mark_contacted(&self, id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE leads SET last_contacted = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("lead {}", id)));
        }

        tx.commit().await?;
        tracing::debug!(lead_id = %id, %at, "Lead contact time recorded");
        Ok(())
    }

    /// Leads currently in `status`, oldest first.
    ///
    /// The stream reads the store as it is polled; call again for a fresh view.
    pub fn query_by_status(&self, status: LeadStatus) -> BoxStream<'_, Result<Lead, AppError>> {
        sqlx::query_as::<_, Lead>(
            "SELECT * FROM leads WHERE status = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(status)
        .fetch(&self.pool)
        .map_err(AppError::from)
        .boxed()
    }

    /// Leads currently carrying `priority`, oldest first.
    pub fn query_by_priority(&self, priority: Priority) -> BoxStream<'_, Result<Lead, AppError>> {
        sqlx::query_as::<_, Lead>(
            "SELECT * FROM leads WHERE priority = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(priority)
        .fetch(&self.pool)
        .map_err(AppError::from)
        .boxed()
    }

    /// Quality figures for leads created at or after `since`.
    pub async fn quality_stats(&self, since: DateTime<Utc>) -> Result<LeadQualityStats, AppError> {
        let mut conn = self.pool.acquire().await?;
        quality_stats(&mut conn, since).await
    }
}

pub(crate) async fn fetch_lead(conn: &mut SqliteConnection, id: &str) -> Result<Lead, AppError> {
    sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .with_context(|| format!("loading lead {}", id))?
        .ok_or_else(|| AppError::NotFound(format!("lead {}", id)))
}

pub(crate) async fn lead_exists(conn: &mut SqliteConnection, id: &str) -> Result<bool, AppError> {
    let found: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM leads WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

/// The single write path for `status`. Both score derivation and explicit
/// overrides go through here so priority always matches status.
///
/// `scores` carries `(lead_score, qualified_score)` when the status was
/// derived from a new score.
pub(crate) async fn set_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: LeadStatus,
    scores: Option<(f64, f64)>,
) -> Result<Lead, AppError> {
    let current = fetch_lead(conn, id).await?;
    let (lead_score, qualified_score) = match scores {
        Some((raw, qualified)) => (raw, Some(qualified)),
        None => (current.lead_score, current.qualified_score),
    };

    // a qualified tier must be the one its stored score falls into
    if is_qualified_tier(status) {
        match qualified_score.map(scoring::tier_for) {
            Some(tier) if tier == status => {}
            Some(tier) => {
                return Err(AppError::Validation(format!(
                    "lead {} scores into {}, not {}",
                    id,
                    tier.as_str(),
                    status.as_str()
                )));
            }
            None => {
                return Err(AppError::Validation(format!(
                    "lead {} has no qualified_score; score it before setting {}",
                    id,
                    status.as_str()
                )));
            }
        }
    }

    let priority = scoring::priority_for(status, current.priority);

    let lead = sqlx::query_as::<_, Lead>(
        r#"
        UPDATE leads
        SET status = ?, priority = ?, lead_score = ?, qualified_score = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(status)
    .bind(priority)
    .bind(lead_score)
    .bind(qualified_score)
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(lead)
}

fn is_qualified_tier(status: LeadStatus) -> bool {
    matches!(
        status,
        LeadStatus::QualifiedHigh | LeadStatus::QualifiedMedium | LeadStatus::QualifiedLow
    )
}

pub(crate) async fn quality_stats(
    conn: &mut SqliteConnection,
    since: DateTime<Utc>,
) -> Result<LeadQualityStats, AppError> {
    let (total, average_score, qualified, converted): (i64, Option<f64>, Option<i64>, Option<i64>) =
        sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                AVG(lead_score),
                SUM(CASE WHEN status IN ('qualified_high', 'qualified_medium', 'qualified_low') THEN 1 ELSE 0 END),
                SUM(CASE WHEN status = 'converted' THEN 1 ELSE 0 END)
            FROM leads
            WHERE created_at >= ?
            "#,
        )
        .bind(since)
        .fetch_one(&mut *conn)
        .await?;

    Ok(LeadQualityStats {
        total,
        average_score: average_score.unwrap_or(0.0),
        qualified: qualified.unwrap_or(0),
        converted: converted.unwrap_or(0),
    })
}

/// Trims text fields and enforces required ones.
fn normalize(mut new: NewLead) -> Result<NewLead, AppError> {
    new.company_name = new.company_name.trim().to_string();
    if new.company_name.is_empty() {
        return Err(AppError::Validation("company_name is required".to_string()));
    }

    new.id = match new.id.map(|id| id.trim().to_string()) {
        Some(id) if id.is_empty() => {
            return Err(AppError::Validation("lead id cannot be blank".to_string()))
        }
        other => other,
    };

    new.contact_email = blank_to_none(new.contact_email).map(|e| e.to_lowercase());
    if let Some(email) = &new.contact_email {
        if !scoring::is_valid_email(email) {
            return Err(AppError::Validation(format!(
                "contact_email is not a valid address: {}",
                email
            )));
        }
    }

    new.contact_name = blank_to_none(new.contact_name);
    new.industry = blank_to_none(new.industry);
    new.size = blank_to_none(new.size);
    new.location = blank_to_none(new.location);
    new.source = blank_to_none(new.source);

    if let Some(score) = new.lead_score {
        scoring::validate_lead_score(score)?;
    }

    Ok(new)
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// Score is lifecycle state, not part of the creation payload.
fn same_payload(existing: &Lead, new: &NewLead) -> bool {
    existing.company_name == new.company_name
        && existing.contact_email == new.contact_email
        && existing.contact_name == new.contact_name
        && existing.industry == new.industry
        && existing.size == new.size
        && existing.location == new.location
        && existing.source == new.source
}
