//! Cross-module scenarios driven through the session facade, with the mock
//! advisor service standing in for the backend.

use std::sync::Arc;

use time::macros::datetime;
use time::{Duration, OffsetDateTime};

use sentinel_domain::{DraftStatus, PlanStatus, Priority, TriageAction};

use crate::adapters::AdvisorService;
use crate::error::CoreError;
use crate::feed::{FeedConfig, RevealOutcome};
use crate::scheduler::{ScanConfig, TickOutcome};
use crate::session::{AdvisorSession, SessionConfig};
use crate::store::{JsonFileStateStore, MemoryStateStore};
use crate::test_support::{fixture_alerts, MockAdvisorService};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn session_config() -> SessionConfig {
    SessionConfig {
        feed: FeedConfig {
            visible_window: 50,
            deferred_window: 5,
            stagger: Duration::milliseconds(120),
        },
        scan: ScanConfig {
            first_delay: Duration::seconds(8),
            interval: Duration::seconds(45),
        },
        ..SessionConfig::default()
    }
}

fn session_over(service: Arc<MockAdvisorService>) -> AdvisorSession {
    AdvisorSession::new(
        service,
        session_config(),
        Box::new(MemoryStateStore::new()),
        Box::new(MemoryStateStore::new()),
    )
}

fn drain_reveal(session: &mut AdvisorSession, epoch: u64, start: OffsetDateTime) {
    let mut now = start;
    loop {
        match session.reveal_step(epoch, now) {
            RevealOutcome::Revealed { .. } => {}
            RevealOutcome::Waiting { next_at } => now = next_at,
            RevealOutcome::Complete | RevealOutcome::Superseded => return,
        }
    }
}

#[tokio::test]
async fn oversized_pool_fills_the_window_and_drips_the_overflow_back() {
    init_tracing();
    let now = datetime!(2026-03-01 09:00 UTC);
    let service = Arc::new(MockAdvisorService::with_alerts(fixture_alerts(60, now)));
    let mut session = session_over(service);

    let ticket = session.refresh_alerts(now).await.expect("refresh");
    drain_reveal(&mut session, ticket.epoch, now);
    assert_eq!(session.visible_alerts().len(), 50);

    // Arm the schedule, then tick past the first delay.
    let outcome = session.autonomous_tick(now).await.expect("arming tick");
    assert!(matches!(outcome, TickOutcome::NotDue { .. }));
    let past_due = now + Duration::seconds(10);
    let outcome = session.autonomous_tick(past_due).await.expect("due tick");
    assert!(matches!(outcome, TickOutcome::Fired { .. }));

    // Exactly one deferred alert surfaced, at the front, high and fresh.
    assert_eq!(session.visible_alerts().len(), 51);
    let front = &session.visible_alerts()[0];
    assert_eq!(front.priority, Priority::High);
    assert_eq!(front.created_at, past_due);
    assert!(front.recently_arrived);
    assert!(session.health().is_some());

    // The next tick is not due until a full interval elapses.
    let outcome = session
        .autonomous_tick(past_due + Duration::seconds(1))
        .await
        .expect("tick");
    assert!(matches!(outcome, TickOutcome::NotDue { .. }));
}

#[tokio::test]
async fn triage_removes_the_alert_drops_the_selection_and_counts_the_action() {
    init_tracing();
    let now = datetime!(2026-03-01 09:00 UTC);
    let service = Arc::new(MockAdvisorService::with_alerts(fixture_alerts(5, now)));
    let mut session = session_over(service);

    let ticket = session.refresh_alerts(now).await.expect("refresh");
    drain_reveal(&mut session, ticket.epoch, now);

    let target = session.visible_alerts()[0].id;
    session.select_alert(target).await.expect("select");
    assert_eq!(session.selected_alert(), Some(target));

    session
        .triage(target, TriageAction::Escalate)
        .await
        .expect("escalate");

    assert!(session.visible_alerts().iter().all(|alert| alert.id != target));
    assert_eq!(session.selected_alert(), None);
    assert_eq!(session.session_counters().escalated, 1);
    assert_eq!(session.session_counters().actions, 1);
}

#[tokio::test]
async fn plan_and_draft_actions_require_a_selection() {
    init_tracing();
    let service = Arc::new(MockAdvisorService::with_fixture_alerts(3));
    let mut session = session_over(service);

    let error = session
        .generate_plan(266_000.0, false)
        .await
        .expect_err("no selection");
    assert!(matches!(error, CoreError::NoSelection));

    let error = session.create_draft(false).await.expect_err("no selection");
    assert!(matches!(error, CoreError::NoSelection));
}

#[tokio::test]
async fn changing_the_selection_discards_workflow_instances() {
    init_tracing();
    let now = datetime!(2026-03-01 09:00 UTC);
    let service = Arc::new(MockAdvisorService::with_alerts(fixture_alerts(3, now)));
    let mut session = session_over(service);
    let ticket = session.refresh_alerts(now).await.expect("refresh");
    drain_reveal(&mut session, ticket.epoch, now);

    let first = session.visible_alerts()[0].id;
    let second = session.visible_alerts()[1].id;

    session.select_alert(first).await.expect("select");
    session.generate_plan(266_000.0, false).await.expect("generate");
    session.create_draft(false).await.expect("draft");
    assert!(session.current_plan().is_some());
    assert!(session.current_draft().is_some());

    session.select_alert(second).await.expect("reselect");
    assert!(session.current_plan().is_none());
    assert!(session.current_draft().is_none());
}

#[tokio::test]
async fn full_plan_chain_through_the_session_reaches_executed() {
    init_tracing();
    let now = datetime!(2026-03-01 09:00 UTC);
    let service = Arc::new(MockAdvisorService::with_alerts(fixture_alerts(1, now)));
    let mut session = session_over(service);
    let ticket = session.refresh_alerts(now).await.expect("refresh");
    drain_reveal(&mut session, ticket.epoch, now);

    let target = session.visible_alerts()[0].id;
    session.select_alert(target).await.expect("select");

    session.generate_plan(266_000.0, false).await.expect("generate");
    session.queue_plan().await.expect("queue");

    // Executing out of order is rejected without changing the plan.
    let error = session.execute_plan().await.expect_err("skip approve");
    assert!(matches!(error, CoreError::Transition(_)));
    assert_eq!(
        session.current_plan().map(|plan| plan.status),
        Some(PlanStatus::Queued)
    );

    session.approve_plan().await.expect("approve");
    let plan = session.execute_plan().await.expect("execute");
    assert_eq!(plan.status, PlanStatus::Executed);
}

#[tokio::test]
async fn draft_lifecycle_updates_the_session_counters() {
    init_tracing();
    let now = datetime!(2026-03-01 09:00 UTC);
    let service = Arc::new(MockAdvisorService::with_alerts(fixture_alerts(1, now)));
    let mut session = session_over(service);
    let ticket = session.refresh_alerts(now).await.expect("refresh");
    drain_reveal(&mut session, ticket.epoch, now);

    let target = session.visible_alerts()[0].id;
    session.select_alert(target).await.expect("select");

    session.create_draft(false).await.expect("create");
    let draft = session
        .reject_draft(Some("needs a softer tone".to_owned()))
        .await
        .expect("reject");
    assert_eq!(draft.status, DraftStatus::Rejected);
    assert_eq!(
        draft.rejection_reason.as_deref(),
        Some("needs a softer tone")
    );

    // Force regeneration restarts the workflow from a terminal state.
    let draft = session.create_draft(true).await.expect("regenerate");
    assert_eq!(draft.status, DraftStatus::PendingApproval);
    session.approve_draft().await.expect("approve");

    let counters = session.session_counters();
    assert_eq!(counters.drafts_created, 2);
    assert_eq!(counters.drafts_rejected, 1);
    assert_eq!(counters.drafts_approved, 1);
}

#[tokio::test]
async fn manual_scan_enlarges_the_pool_and_rearms_the_schedule() {
    init_tracing();
    let now = datetime!(2026-03-01 09:00 UTC);
    let service = Arc::new(MockAdvisorService::with_alerts(fixture_alerts(4, now)));
    let mut session = session_over(service);
    let ticket = session.refresh_alerts(now).await.expect("refresh");
    drain_reveal(&mut session, ticket.epoch, now);
    assert_eq!(session.visible_alerts().len(), 4);

    let summary = session.run_manual_scan(now).await.expect("manual scan");
    assert_eq!(summary.created_alerts_count, 2);

    // The scan refreshed the queue; the new ingest must be revealed again.
    let epoch = {
        let ticket = session.refresh_alerts(now).await.expect("refresh");
        ticket.epoch
    };
    drain_reveal(&mut session, epoch, now);
    assert_eq!(session.visible_alerts().len(), 6);
}

#[tokio::test]
async fn stale_reveal_steps_after_a_refresh_are_ignored() {
    init_tracing();
    let now = datetime!(2026-03-01 09:00 UTC);
    let service = Arc::new(MockAdvisorService::with_alerts(fixture_alerts(6, now)));
    let mut session = session_over(service);

    let stale = session.refresh_alerts(now).await.expect("first refresh");
    assert!(matches!(
        session.reveal_step(stale.epoch, now),
        RevealOutcome::Revealed { .. }
    ));

    let fresh = session.refresh_alerts(now).await.expect("second refresh");
    assert_eq!(
        session.reveal_step(stale.epoch, now + Duration::minutes(1)),
        RevealOutcome::Superseded
    );

    drain_reveal(&mut session, fresh.epoch, now);
    assert_eq!(session.visible_alerts().len(), 6);
}

#[tokio::test]
async fn counters_persist_across_sessions_sharing_one_store() {
    init_tracing();
    let path = std::env::temp_dir().join(format!(
        "sentinel-session-{}-counters.json",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);

    let now = datetime!(2026-03-01 09:00 UTC);
    let service = Arc::new(MockAdvisorService::with_alerts(fixture_alerts(3, now)));

    {
        let mut session = AdvisorSession::new(
            Arc::clone(&service) as Arc<dyn AdvisorService>,
            session_config(),
            Box::new(JsonFileStateStore::new(&path)),
            Box::new(MemoryStateStore::new()),
        );
        let ticket = session.refresh_alerts(now).await.expect("refresh");
        drain_reveal(&mut session, ticket.epoch, now);
        let target = session.visible_alerts()[0].id;
        session
            .triage(target, TriageAction::Reviewed)
            .await
            .expect("review");
    }

    let reloaded = AdvisorSession::new(
        service,
        session_config(),
        Box::new(JsonFileStateStore::new(&path)),
        Box::new(MemoryStateStore::new()),
    );
    assert_eq!(reloaded.session_counters().reviewed, 1);
    assert_eq!(reloaded.session_counters().actions, 1);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn console_events_narrate_a_triage_action() {
    init_tracing();
    let now = datetime!(2026-03-01 09:00 UTC);
    let service = Arc::new(MockAdvisorService::with_alerts(fixture_alerts(2, now)));
    let mut session = session_over(service);
    let ticket = session.refresh_alerts(now).await.expect("refresh");
    drain_reveal(&mut session, ticket.epoch, now);

    let mut receiver = session.subscribe();
    let target = session.visible_alerts()[0].id;
    session
        .triage(target, TriageAction::FalsePositive)
        .await
        .expect("dismiss");

    let first = receiver.recv().await.expect("triage event");
    let second = receiver.recv().await.expect("metrics event");
    assert!(matches!(
        first.event,
        crate::events::ConsoleEvent::AlertTriaged(_)
    ));
    assert!(matches!(
        second.event,
        crate::events::ConsoleEvent::MetricsUpdated(_)
    ));
    assert!(second.sequence > first.sequence);
}
