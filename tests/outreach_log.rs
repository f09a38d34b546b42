mod common;

use chrono::{Duration, Utc};
use common::{lead, setup};
use leadflow_core::errors::AppError;
use leadflow_core::leads::LeadStore;
use leadflow_core::models::{CampaignSummary, CampaignType, OutreachStatus};
use leadflow_core::outreach::OutreachLog;

#[tokio::test]
async fn campaign_summary_counts_each_outcome() {
    let db = setup().await;
    let leads = LeadStore::new(db.pool.clone());
    let log = OutreachLog::new(db.pool.clone());

    for id in ["a", "b", "c", "d"] {
        leads.create_lead(lead(id, "Acme")).await.unwrap();
    }

    log.record_send("a", "campaign_A", CampaignType::ColdEmail)
        .await
        .unwrap();
    log.record_send("b", "campaign_A", CampaignType::ColdEmail)
        .await
        .unwrap();
    log.record_failure("c", "campaign_A", CampaignType::ColdEmail, "SMTP 421")
        .await
        .unwrap();
    log.record_bounce("d", "campaign_A", CampaignType::ColdEmail, "mailbox unavailable")
        .await
        .unwrap();
    log.record_send("a", "campaign_B", CampaignType::FollowUp)
        .await
        .unwrap();

    let summary = log.campaign_summary("campaign_A").await.unwrap();
    assert_eq!(
        summary,
        CampaignSummary {
            sent: 2,
            failed: 1,
            bounced: 1
        }
    );
    assert_eq!(summary.total(), 4);
    assert_eq!(summary.success_rate(), 50.0);

    let unknown = log.campaign_summary("campaign_Z").await.unwrap();
    assert_eq!(unknown, CampaignSummary::default());
}

#[tokio::test]
async fn failure_is_recorded_with_its_error() {
    let db = setup().await;
    let leads = LeadStore::new(db.pool.clone());
    let log = OutreachLog::new(db.pool.clone());
    leads.create_lead(lead("lead_1", "Acme")).await.unwrap();

    let recorded = log
        .record_failure("lead_1", "campaign_A", CampaignType::ColdEmail, "connection reset")
        .await
        .unwrap();

    assert!(recorded.lead_exists);
    assert_eq!(recorded.record.status, OutreachStatus::Failed);
    assert_eq!(
        recorded.record.error_message.as_deref(),
        Some("connection reset")
    );
}

#[tokio::test]
async fn orphaned_lead_reference_is_kept_and_flagged() {
    let db = setup().await;
    let log = OutreachLog::new(db.pool.clone());

    let recorded = log
        .record_send("ghost_lead", "campaign_A", CampaignType::ColdEmail)
        .await
        .unwrap();

    assert!(recorded.is_orphaned());
    assert_eq!(recorded.record.lead_id, "ghost_lead");

    let history = log.history_for_lead("ghost_lead").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(log.campaign_summary("campaign_A").await.unwrap().sent, 1);
}

#[tokio::test]
async fn blank_campaign_id_is_rejected() {
    let db = setup().await;
    let log = OutreachLog::new(db.pool.clone());

    let err = log
        .record_send("lead_1", "  ", CampaignType::ColdEmail)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn history_is_oldest_first() {
    let db = setup().await;
    let leads = LeadStore::new(db.pool.clone());
    let log = OutreachLog::new(db.pool.clone());
    leads.create_lead(lead("lead_1", "Acme")).await.unwrap();

    log.record_send("lead_1", "campaign_A", CampaignType::ColdEmail)
        .await
        .unwrap();
    log.record_send("lead_1", "campaign_B", CampaignType::FollowUp)
        .await
        .unwrap();
    log.record_send("lead_1", "campaign_C", CampaignType::ReEngagement)
        .await
        .unwrap();

    let history = log.history_for_lead("lead_1").await.unwrap();
    let campaigns: Vec<_> = history.iter().map(|r| r.campaign_id.as_str()).collect();
    assert_eq!(campaigns, ["campaign_A", "campaign_B", "campaign_C"]);
}

#[tokio::test]
async fn type_performance_groups_by_campaign_type() {
    let db = setup().await;
    let log = OutreachLog::new(db.pool.clone());
    let since = Utc::now() - Duration::hours(1);

    log.record_send("a", "c1", CampaignType::ColdEmail)
        .await
        .unwrap();
    log.record_failure("b", "c1", CampaignType::ColdEmail, "timeout")
        .await
        .unwrap();
    log.record_send("a", "c2", CampaignType::FollowUp)
        .await
        .unwrap();

    let performance = log.type_performance(since).await.unwrap();
    assert_eq!(performance.len(), 2);

    let cold = performance
        .iter()
        .find(|p| p.campaign_type == CampaignType::ColdEmail)
        .unwrap();
    assert_eq!(cold.summary.sent, 1);
    assert_eq!(cold.summary.failed, 1);
    assert_eq!(cold.summary.success_rate(), 50.0);

    let follow_up = performance
        .iter()
        .find(|p| p.campaign_type == CampaignType::FollowUp)
        .unwrap();
    assert_eq!(follow_up.summary.success_rate(), 100.0);

    let later = log
        .type_performance(Utc::now() + Duration::hours(1))
        .await
        .unwrap();
    assert!(later.is_empty());
}
