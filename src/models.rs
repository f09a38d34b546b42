use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use std::str::FromStr;

// ============ Enumerations ============

/// Lifecycle status of a lead.
///
/// The `Qualified*` variants are derived from `qualified_score`; the rest are
/// set explicitly by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    QualifiedHigh,
    QualifiedMedium,
    QualifiedLow,
    Contacted,
    Converted,
    Rejected,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::QualifiedHigh => "qualified_high",
            LeadStatus::QualifiedMedium => "qualified_medium",
            LeadStatus::QualifiedLow => "qualified_low",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Converted => "converted",
            LeadStatus::Rejected => "rejected",
        }
    }
}

/// Outreach priority. Only qualified leads carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CampaignType {
    ColdEmail,
    FollowUp,
    ReEngagement,
}

impl CampaignType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignType::ColdEmail => "cold_email",
            CampaignType::FollowUp => "follow_up",
            CampaignType::ReEngagement => "re_engagement",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OutreachStatus {
    Sent,
    Failed,
    Bounced,
}

impl OutreachStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutreachStatus::Sent => "sent",
            OutreachStatus::Failed => "failed",
            OutreachStatus::Bounced => "bounced",
        }
    }
}

/// Follow-up state machine: `Scheduled` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FollowUpStatus {
    Scheduled,
    Sent,
    Cancelled,
    Failed,
}

impl FollowUpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowUpStatus::Scheduled => "scheduled",
            FollowUpStatus::Sent => "sent",
            FollowUpStatus::Cancelled => "cancelled",
            FollowUpStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, FollowUpStatus::Scheduled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Active,
    Paused,
    Churned,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Active => "active",
            ClientStatus::Paused => "paused",
            ClientStatus::Churned => "churned",
        }
    }
}

// ============ Database Models ============

/// A prospective client record under qualification.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub company_name: String,
    pub contact_email: Option<String>,
    pub contact_name: Option<String>,
    pub industry: Option<String>,
    /// Headcount band, e.g. "10-50".
    pub size: Option<String>,
    pub location: Option<String>,
    /// Raw score as supplied by the scoring service. Unbounded, never negative.
    pub lead_score: f64,
    /// Normalized score the status tiers are derived from. `None` until scored.
    pub qualified_score: Option<f64>,
    pub status: LeadStatus,
    pub priority: Option<Priority>,
    pub source: Option<String>,
    pub last_contacted: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted by `LeadStore::create_lead`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewLead {
    /// Caller-chosen id; a UUID is generated when absent.
    pub id: Option<String>,
    pub company_name: String,
    pub contact_email: Option<String>,
    pub contact_name: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub location: Option<String>,
    /// Provisional raw score known at ingestion time.
    pub lead_score: Option<f64>,
    pub source: Option<String>,
}

impl NewLead {
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// One outreach attempt against a lead, as recorded in `outreach_log`.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct OutreachRecord {
    pub id: i64,
    /// Soft reference to `leads.id`; may be orphaned.
    pub lead_id: String,
    pub campaign_id: String,
    pub campaign_type: CampaignType,
    pub status: OutreachStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A scheduled touchpoint tied to a lead.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct FollowUp {
    pub id: i64,
    pub lead_id: String,
    pub follow_up_type: String,
    pub scheduled_date: DateTime<Utc>,
    pub subject: Option<String>,
    pub template: Option<String>,
    pub status: FollowUpStatus,
    /// Set if and only if `status` is `Sent`.
    pub sent_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted by `FollowUpScheduler::schedule`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFollowUp {
    pub lead_id: String,
    pub follow_up_type: String,
    pub scheduled_date: DateTime<Utc>,
    pub subject: Option<String>,
    pub template: Option<String>,
}

/// A lead that converted to a paying relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub company_name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub monthly_rate: BigDecimal,
    pub start_date: Option<NaiveDate>,
    pub status: ClientStatus,
    pub created_at: DateTime<Utc>,
}

// monthly_rate is kept as exact decimal text; SQLite has no decimal type.
impl<'r> FromRow<'r, SqliteRow> for Client {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let raw_rate: String = row.try_get("monthly_rate")?;
        let monthly_rate =
            BigDecimal::from_str(&raw_rate).map_err(|e| sqlx::Error::ColumnDecode {
                index: "monthly_rate".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            company_name: row.try_get("company_name")?,
            contact_person: row.try_get("contact_person")?,
            email: row.try_get("email")?,
            monthly_rate,
            start_date: row.try_get("start_date")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClient {
    pub company_name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub monthly_rate: BigDecimal,
    pub start_date: Option<NaiveDate>,
}

/// One immutable sample of an operational or business metric.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Metric {
    pub id: i64,
    pub metric_type: String,
    pub metric_value: f64,
    pub recorded_at: DateTime<Utc>,
}

// ============ Operation Results ============

/// An appended record together with the outcome of the opportunistic check on
/// its lead reference. `lead_exists == false` is a warning, not a failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recorded<T> {
    pub record: T,
    pub lead_exists: bool,
}

impl<T> Recorded<T> {
    pub fn is_orphaned(&self) -> bool {
        !self.lead_exists
    }
}

/// Outcome counts for one campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub sent: i64,
    pub failed: i64,
    pub bounced: i64,
}

impl CampaignSummary {
    pub fn total(&self) -> i64 {
        self.sent + self.failed + self.bounced
    }

    /// Percentage of attempts that were sent, 0 when nothing was attempted.
    pub fn success_rate(&self) -> f64 {
        percentage(self.sent, self.total())
    }
}

/// Outcome counts for one campaign type over a time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypePerformance {
    pub campaign_type: CampaignType,
    pub summary: CampaignSummary,
}

/// Lead quality figures for leads created within a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LeadQualityStats {
    pub total: i64,
    pub average_score: f64,
    pub qualified: i64,
    pub converted: i64,
}

impl LeadQualityStats {
    pub fn qualification_rate(&self) -> f64 {
        percentage(self.qualified, self.total)
    }

    pub fn conversion_rate(&self) -> f64 {
        percentage(self.converted, self.total)
    }
}

/// Derived statistics appended to `system_metrics` in one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessSnapshot {
    pub recorded_at: DateTime<Utc>,
    pub leads_generated: i64,
    pub leads_qualified: i64,
    pub leads_converted: i64,
    pub conversion_rate: f64,
    pub emails_sent: i64,
    pub email_success_rate: f64,
    pub active_clients: i64,
    pub revenue_current: f64,
    pub revenue_progress: f64,
}

impl BusinessSnapshot {
    /// `(metric_type, value)` pairs in the order they are written.
    pub fn samples(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("leads_generated", self.leads_generated as f64),
            ("leads_qualified", self.leads_qualified as f64),
            ("leads_converted", self.leads_converted as f64),
            ("conversion_rate", self.conversion_rate),
            ("emails_sent", self.emails_sent as f64),
            ("email_success_rate", self.email_success_rate),
            ("active_clients", self.active_clients as f64),
            ("revenue_current", self.revenue_current),
            ("revenue_progress", self.revenue_progress),
        ]
    }
}

pub(crate) fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
