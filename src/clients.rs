//! Client records and lead-to-client promotion.

use bigdecimal::{BigDecimal, Zero};
use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::errors::AppError;
use crate::leads;
use crate::models::{Client, ClientStatus, LeadStatus, NewClient};

pub struct ClientStore {
    pool: SqlitePool,
}

impl ClientStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_client(&self, new: NewClient) -> Result<Client, AppError> {
        let mut tx = self.pool.begin().await?;
        let client = insert_client(&mut tx, new).await?;
        tx.commit().await?;

        tracing::info!(client_id = client.id, company = %client.company_name, "Client created");
        Ok(client)
    }

    pub async fn get_client(&self, id: i64) -> Result<Client, AppError> {
        sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("client {}", id)))
    }

    pub async fn set_client_status(
        &self,
        id: i64,
        status: ClientStatus,
    ) -> Result<Client, AppError> {
        let mut tx = self.pool.begin().await?;

        let client = sqlx::query_as::<_, Client>(
            "UPDATE clients SET status = ? WHERE id = ? RETURNING *",
        )
        .bind(status)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("client {}", id)))?;

        tx.commit().await?;

        tracing::info!(client_id = id, status = status.as_str(), "Client status updated");
        Ok(client)
    }

    pub async fn list_by_status(&self, status: ClientStatus) -> Result<Vec<Client>, AppError> {
        let clients = sqlx::query_as::<_, Client>(
            "SELECT * FROM clients WHERE status = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(clients)
    }

    /// Exact sum of `monthly_rate` over active clients.
    pub async fn active_monthly_revenue(&self) -> Result<BigDecimal, AppError> {
        let mut conn = self.pool.acquire().await?;
        let (_, revenue) = active_revenue(&mut conn).await?;
        Ok(revenue)
    }

    /// Promotes a lead: marks it converted and opens a client for it, both in
    /// one transaction.
    pub async fn convert_lead(
        &self,
        lead_id: &str,
        monthly_rate: BigDecimal,
        start_date: Option<NaiveDate>,
    ) -> Result<Client, AppError> {
        let mut tx = self.pool.begin().await?;

        let lead = leads::fetch_lead(&mut tx, lead_id).await?;
        if matches!(lead.status, LeadStatus::Converted | LeadStatus::Rejected) {
            return Err(AppError::Validation(format!(
                "lead {} is {} and cannot be converted",
                lead_id,
                lead.status.as_str()
            )));
        }

        leads::set_status(&mut tx, lead_id, LeadStatus::Converted, None).await?;

        let client = insert_client(
            &mut tx,
            NewClient {
                company_name: lead.company_name,
                contact_person: lead.contact_name,
                email: lead.contact_email,
                monthly_rate,
                start_date,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            lead_id,
            client_id = client.id,
            monthly_rate = %client.monthly_rate,
            "Lead converted to client"
        );
        Ok(client)
    }
}

async fn insert_client(conn: &mut SqliteConnection, new: NewClient) -> Result<Client, AppError> {
    let company_name = new.company_name.trim();
    if company_name.is_empty() {
        return Err(AppError::Validation("company_name is required".to_string()));
    }
    if new.monthly_rate < BigDecimal::zero() {
        return Err(AppError::Validation(format!(
            "monthly_rate cannot be negative, got {}",
            new.monthly_rate
        )));
    }

    let client = sqlx::query_as::<_, Client>(
        r#"
        INSERT INTO clients (company_name, contact_person, email, monthly_rate, start_date, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(company_name)
    .bind(&new.contact_person)
    .bind(&new.email)
    .bind(new.monthly_rate.to_string())
    .bind(new.start_date)
    .bind(ClientStatus::Active)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    Ok(client)
}

/// Count and exact revenue of active clients.
pub(crate) async fn active_revenue(
    conn: &mut SqliteConnection,
) -> Result<(i64, BigDecimal), AppError> {
    let active: Vec<Client> = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE status = ?")
        .bind(ClientStatus::Active)
        .fetch_all(&mut *conn)
        .await?;

    let total = active
        .iter()
        .fold(BigDecimal::zero(), |acc, c| acc + &c.monthly_rate);

    Ok((active.len() as i64, total))
}
