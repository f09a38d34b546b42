mod common;

use chrono::{DateTime, Duration, Utc};
use common::{collect, lead, setup};
use leadflow_core::errors::AppError;
use leadflow_core::follow_ups::FollowUpScheduler;
use leadflow_core::leads::LeadStore;
use leadflow_core::models::{FollowUpStatus, NewFollowUp};

fn follow_up(lead_id: &str, at: DateTime<Utc>) -> NewFollowUp {
    NewFollowUp {
        lead_id: lead_id.to_string(),
        follow_up_type: "follow_up".to_string(),
        scheduled_date: at,
        subject: Some("Checking in".to_string()),
        template: Some("follow_up_1".to_string()),
    }
}

#[tokio::test]
async fn schedule_creates_scheduled_follow_up() {
    let db = setup().await;
    let leads = LeadStore::new(db.pool.clone());
    let scheduler = FollowUpScheduler::new(db.pool.clone());
    leads.create_lead(lead("lead_1", "Acme")).await.unwrap();

    let tomorrow = Utc::now() + Duration::days(1);
    let recorded = scheduler
        .schedule(follow_up("lead_1", tomorrow))
        .await
        .unwrap();

    assert!(recorded.lead_exists);
    let record = recorded.record;
    assert_eq!(record.status, FollowUpStatus::Scheduled);
    assert_eq!(record.scheduled_date, tomorrow);
    assert_eq!(record.sent_at, None);
    assert_eq!(record.template.as_deref(), Some("follow_up_1"));

    assert_eq!(scheduler.get(record.id).await.unwrap(), record);
}

#[tokio::test]
async fn schedule_in_the_past_is_rejected() {
    let db = setup().await;
    let scheduler = FollowUpScheduler::new(db.pool.clone());

    let err = scheduler
        .schedule(follow_up("lead_1", Utc::now() - Duration::hours(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidSchedule(_)));

    let backdated = scheduler
        .schedule_backdated(follow_up("lead_1", Utc::now() - Duration::hours(1)))
        .await
        .unwrap();
    assert_eq!(backdated.record.status, FollowUpStatus::Scheduled);

    let due = collect(scheduler.due_follow_ups(Utc::now())).await;
    assert_eq!(due.len(), 1);
}

#[tokio::test]
async fn orphaned_follow_up_is_flagged() {
    let db = setup().await;
    let scheduler = FollowUpScheduler::new(db.pool.clone());

    let recorded = scheduler
        .schedule(follow_up("ghost_lead", Utc::now() + Duration::days(2)))
        .await
        .unwrap();
    assert!(recorded.is_orphaned());
}

#[tokio::test]
async fn mark_sent_on_orphaned_follow_up_leaves_leads_untouched() {
    let db = setup().await;
    let leads = LeadStore::new(db.pool.clone());
    let scheduler = FollowUpScheduler::new(db.pool.clone());

    let recorded = scheduler
        .schedule(follow_up("ghost_lead", Utc::now() + Duration::hours(1)))
        .await
        .unwrap();

    let sent_at = Utc::now() + Duration::hours(2);
    let sent = scheduler.mark_sent(recorded.record.id, sent_at).await.unwrap();
    assert_eq!(sent.status, FollowUpStatus::Sent);
    assert_eq!(sent.sent_at, Some(sent_at));

    assert!(matches!(
        leads.get_lead("ghost_lead").await.unwrap_err(),
        AppError::NotFound(_)
    ));
}

#[tokio::test]
async fn due_follow_ups_only_returns_scheduled_and_due() {
    let db = setup().await;
    let scheduler = FollowUpScheduler::new(db.pool.clone());
    let now = Utc::now();

    let in_two_days = scheduler
        .schedule(follow_up("a", now + Duration::days(2)))
        .await
        .unwrap()
        .record;
    let in_one_day = scheduler
        .schedule(follow_up("b", now + Duration::days(1)))
        .await
        .unwrap()
        .record;
    let in_three_days = scheduler
        .schedule(follow_up("c", now + Duration::days(3)))
        .await
        .unwrap()
        .record;
    let cancelled = scheduler
        .schedule(follow_up("d", now + Duration::hours(1)))
        .await
        .unwrap()
        .record;
    scheduler.cancel(cancelled.id).await.unwrap();

    let as_of = now + Duration::days(2);
    let due = collect(scheduler.due_follow_ups(as_of)).await;
    let ids: Vec<_> = due.iter().map(|f| f.id).collect();
    assert_eq!(ids, [in_one_day.id, in_two_days.id]);

    for f in &due {
        assert_eq!(f.status, FollowUpStatus::Scheduled);
        assert!(f.scheduled_date <= as_of);
    }
    assert!(!ids.contains(&in_three_days.id));
}

#[tokio::test]
async fn mark_sent_sets_sent_at_and_touches_lead() {
    let db = setup().await;
    let leads = LeadStore::new(db.pool.clone());
    let scheduler = FollowUpScheduler::new(db.pool.clone());
    leads.create_lead(lead("lead_1", "Acme")).await.unwrap();

    let scheduled = scheduler
        .schedule(follow_up("lead_1", Utc::now() + Duration::hours(2)))
        .await
        .unwrap()
        .record;

    let sent_at = Utc::now() + Duration::hours(2);
    let sent = scheduler.mark_sent(scheduled.id, sent_at).await.unwrap();
    assert_eq!(sent.status, FollowUpStatus::Sent);
    assert_eq!(sent.sent_at, Some(sent_at));

    let lead = leads.get_lead("lead_1").await.unwrap();
    assert_eq!(lead.last_contacted, Some(sent_at));

    let due = collect(scheduler.due_follow_ups(sent_at + Duration::days(1))).await;
    assert!(due.is_empty());
}

#[tokio::test]
async fn terminal_states_reject_further_transitions() {
    let db = setup().await;
    let scheduler = FollowUpScheduler::new(db.pool.clone());
    let later = Utc::now() + Duration::days(1);

    let cancelled = scheduler.schedule(follow_up("a", later)).await.unwrap().record;
    scheduler.cancel(cancelled.id).await.unwrap();

    let err = scheduler.mark_sent(cancelled.id, later).await.unwrap_err();
    match err {
        AppError::InvalidTransition { id, from, to } => {
            assert_eq!(id, cancelled.id);
            assert_eq!(from, FollowUpStatus::Cancelled);
            assert_eq!(to, FollowUpStatus::Sent);
        }
        other => panic!("expected InvalidTransition, got {:?}", other),
    }

    let sent = scheduler.schedule(follow_up("b", later)).await.unwrap().record;
    scheduler.mark_sent(sent.id, later).await.unwrap();
    assert!(matches!(
        scheduler.mark_sent(sent.id, later).await.unwrap_err(),
        AppError::InvalidTransition { .. }
    ));
    assert!(matches!(
        scheduler.cancel(sent.id).await.unwrap_err(),
        AppError::InvalidTransition { .. }
    ));

    let failed = scheduler.schedule(follow_up("c", later)).await.unwrap().record;
    let marked = scheduler
        .mark_failed(failed.id, "template rendering failed")
        .await
        .unwrap();
    assert_eq!(marked.status, FollowUpStatus::Failed);
    assert!(marked.status.is_terminal());
    assert_eq!(marked.sent_at, None);
    assert_eq!(
        marked.failure_reason.as_deref(),
        Some("template rendering failed")
    );
    assert!(matches!(
        scheduler.mark_failed(failed.id, "again").await.unwrap_err(),
        AppError::InvalidTransition { .. }
    ));
}

#[tokio::test]
async fn transitions_on_unknown_id_are_not_found() {
    let db = setup().await;
    let scheduler = FollowUpScheduler::new(db.pool.clone());

    assert!(matches!(
        scheduler.mark_sent(999, Utc::now()).await.unwrap_err(),
        AppError::NotFound(_)
    ));
    assert!(matches!(
        scheduler.cancel(999).await.unwrap_err(),
        AppError::NotFound(_)
    ));
    assert!(matches!(
        scheduler.get(999).await.unwrap_err(),
        AppError::NotFound(_)
    ));
}

#[tokio::test]
async fn transition_store_failure_names_the_follow_up() {
    let db = setup().await;
    let scheduler = FollowUpScheduler::new(db.pool.clone());

    sqlx::query("DROP TABLE follow_up_schedule")
        .execute(&db.pool)
        .await
        .unwrap();

    let err = scheduler.cancel(3).await.unwrap_err();
    assert!(matches!(err.root(), AppError::DatabaseError(_)));
    assert!(err
        .to_string()
        .starts_with("moving follow-up 3 to cancelled: "));
}

#[tokio::test]
async fn for_lead_lists_all_statuses_by_date() {
    let db = setup().await;
    let scheduler = FollowUpScheduler::new(db.pool.clone());
    let now = Utc::now();

    let second = scheduler
        .schedule(follow_up("lead_1", now + Duration::days(2)))
        .await
        .unwrap()
        .record;
    let first = scheduler
        .schedule(follow_up("lead_1", now + Duration::days(1)))
        .await
        .unwrap()
        .record;
    scheduler
        .schedule(follow_up("lead_2", now + Duration::days(1)))
        .await
        .unwrap();
    scheduler.cancel(second.id).await.unwrap();

    let listed = scheduler.for_lead("lead_1").await.unwrap();
    let ids: Vec<_> = listed.iter().map(|f| f.id).collect();
    assert_eq!(ids, [first.id, second.id]);
    assert_eq!(listed[1].status, FollowUpStatus::Cancelled);
}
