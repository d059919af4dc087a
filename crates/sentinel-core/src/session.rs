//! Advisor session facade: wires the feed, scheduler, approval workflows,
//! and metrics behind one surface and publishes console events for every
//! state change.
//!
//! Selection scoping is the invariant this layer enforces: plan and draft
//! workflows exist only while their alert is selected, and changing the
//! selection discards them. The backend remains authoritative; a discarded
//! workflow can always be rebuilt from it.

use std::sync::Arc;

use time::OffsetDateTime;

use sentinel_config::SentinelConfig;
use sentinel_domain::{
    AlertDetail, AlertId, AlertSummary, DraftEvent, FollowUpDraft, HealthStatus,
    PerformanceBaseline, PerformanceSnapshot, ReallocationPlan, RunSummary, TriageAction,
};

use crate::adapters::{AdvisorService, AlertQuery};
use crate::approval::{DraftWorkflow, PlanWorkflow};
use crate::bus::{ConsoleEventBus, ConsoleEventEnvelope};
use crate::error::CoreError;
use crate::events::{
    AlertRevealedPayload, AlertTriagedPayload, AlertsIngestedPayload, ConsoleEvent,
    DeferredReleasedPayload, MetricsUpdatedPayload, ScanCompletedPayload,
};
use crate::feed::{FeedConfig, IngestTicket, QueueFeedController, RevealOutcome};
use crate::metrics::{baseline_from, SessionMetrics};
use crate::scheduler::{ScanConfig, ScanEffects, ScanScheduler, TickOutcome};
use crate::store::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SessionConfig {
    pub feed: FeedConfig,
    pub scan: ScanConfig,
    pub baseline: PerformanceBaseline,
}

impl From<&SentinelConfig> for SessionConfig {
    fn from(config: &SentinelConfig) -> Self {
        Self {
            feed: FeedConfig::from(&config.feed),
            scan: ScanConfig::from(&config.scan),
            baseline: baseline_from(&config.metrics),
        }
    }
}

pub struct AdvisorSession {
    service: Arc<dyn AdvisorService>,
    bus: ConsoleEventBus,
    feed: QueueFeedController,
    scheduler: ScanScheduler,
    metrics: SessionMetrics,
    persistent: Box<dyn StateStore>,
    session_store: Box<dyn StateStore>,
    selected: Option<AlertId>,
    plan: Option<PlanWorkflow>,
    draft: Option<DraftWorkflow>,
    health: Option<HealthStatus>,
}

impl AdvisorSession {
    pub fn new(
        service: Arc<dyn AdvisorService>,
        config: SessionConfig,
        persistent: Box<dyn StateStore>,
        session_store: Box<dyn StateStore>,
    ) -> Self {
        let metrics = SessionMetrics::restore(config.baseline, persistent.as_ref());
        Self {
            service,
            bus: ConsoleEventBus::default(),
            feed: QueueFeedController::new(config.feed),
            scheduler: ScanScheduler::new(config.scan),
            metrics,
            persistent,
            session_store,
            selected: None,
            plan: None,
            draft: None,
            health: None,
        }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ConsoleEventEnvelope> {
        self.bus.subscribe()
    }

    pub fn visible_alerts(&self) -> &[AlertSummary] {
        self.feed.visible()
    }

    pub fn selected_alert(&self) -> Option<AlertId> {
        self.selected
    }

    pub fn current_plan(&self) -> Option<&ReallocationPlan> {
        self.plan.as_ref().and_then(PlanWorkflow::current)
    }

    pub fn current_draft(&self) -> Option<&FollowUpDraft> {
        self.draft.as_ref().and_then(DraftWorkflow::current)
    }

    pub fn health(&self) -> Option<&HealthStatus> {
        self.health.as_ref()
    }

    pub fn session_counters(&self) -> &sentinel_domain::SessionCounters {
        self.metrics.counters()
    }

    /// Fetches the open-alert pool, replaces the queue with its ranked head,
    /// and holds the overflow back for later drip release. Returns the ticket
    /// a reveal driver needs.
    pub async fn refresh_alerts(&mut self, now: OffsetDateTime) -> Result<IngestTicket, CoreError> {
        let fetch_limit = (self.feed.config().visible_window + self.feed.config().deferred_window)
            as u32;
        let page = self.service.list_alerts(AlertQuery::open_alerts(fetch_limit)).await?;

        let ticket = self.feed.ingest(page.items.clone(), now);
        self.feed.seed_deferred(page.items);
        self.bus.publish(ConsoleEvent::AlertsIngested(AlertsIngestedPayload {
            epoch: ticket.epoch,
            visible_count: self.feed.pending_len(),
            deferred_count: self.feed.deferred_len(),
        }));
        Ok(ticket)
    }

    /// One pull-driven reveal step; publishes each newly visible alert.
    pub fn reveal_step(&mut self, epoch: u64, now: OffsetDateTime) -> RevealOutcome {
        let outcome = self.feed.reveal_step(epoch, now);
        if let RevealOutcome::Revealed { alert_id, .. } = outcome {
            self.bus.publish(ConsoleEvent::AlertRevealed(AlertRevealedPayload {
                epoch,
                alert_id,
            }));
        }
        outcome
    }

    /// Selects an alert, loading its detail and arming fresh plan and draft
    /// workflows scoped to it.
    pub async fn select_alert(&mut self, alert_id: AlertId) -> Result<AlertDetail, CoreError> {
        let detail = self.service.get_alert(alert_id).await?;
        self.feed.mark_opened(alert_id);
        self.selected = Some(alert_id);
        self.plan = Some(PlanWorkflow::new(alert_id));
        self.draft = Some(DraftWorkflow::new(alert_id));
        Ok(detail)
    }

    /// Drops the selection and both in-flight workflow instances.
    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.plan = None;
        self.draft = None;
    }

    /// Applies a terminal triage action. On success the alert leaves the
    /// queue immediately, the selection scoped to it is dropped, and the
    /// session counters are bumped and persisted.
    pub async fn triage(
        &mut self,
        alert_id: AlertId,
        action: TriageAction,
    ) -> Result<AlertDetail, CoreError> {
        let detail = self.service.apply_triage_action(alert_id, action).await?;

        self.feed.remove_by_id(alert_id);
        if self.selected == Some(alert_id) {
            self.clear_selection();
        }
        self.metrics.record_triage(action, self.persistent.as_mut());
        self.bus.publish(ConsoleEvent::AlertTriaged(AlertTriagedPayload {
            alert_id,
            action,
        }));
        self.publish_metrics();
        Ok(detail)
    }

    pub async fn generate_plan(
        &mut self,
        target_cash_amount: f64,
        regenerate: bool,
    ) -> Result<&ReallocationPlan, CoreError> {
        let workflow = self.plan.as_mut().ok_or(CoreError::NoSelection)?;
        workflow
            .generate(self.service.as_ref(), &self.bus, target_cash_amount, regenerate)
            .await
    }

    pub async fn queue_plan(&mut self) -> Result<&ReallocationPlan, CoreError> {
        let workflow = self.plan.as_mut().ok_or(CoreError::NoSelection)?;
        workflow.queue(self.service.as_ref(), &self.bus).await
    }

    pub async fn approve_plan(&mut self) -> Result<&ReallocationPlan, CoreError> {
        let workflow = self.plan.as_mut().ok_or(CoreError::NoSelection)?;
        workflow.approve(self.service.as_ref(), &self.bus).await
    }

    pub async fn execute_plan(&mut self) -> Result<&ReallocationPlan, CoreError> {
        let workflow = self.plan.as_mut().ok_or(CoreError::NoSelection)?;
        workflow.execute(self.service.as_ref(), &self.bus).await
    }

    pub async fn create_draft(
        &mut self,
        force_regenerate: bool,
    ) -> Result<&FollowUpDraft, CoreError> {
        let workflow = self.draft.as_mut().ok_or(CoreError::NoSelection)?;
        workflow
            .create(self.service.as_ref(), &self.bus, force_regenerate)
            .await?;
        self.metrics.record_draft(DraftEvent::Created, self.persistent.as_mut());
        self.publish_metrics();
        // The borrow of the workflow ended above; re-borrow for the return.
        self.draft
            .as_ref()
            .and_then(DraftWorkflow::current)
            .ok_or(CoreError::NoSelection)
    }

    pub async fn approve_draft(&mut self) -> Result<&FollowUpDraft, CoreError> {
        let workflow = self.draft.as_mut().ok_or(CoreError::NoSelection)?;
        workflow.approve(self.service.as_ref(), &self.bus).await?;
        self.metrics.record_draft(DraftEvent::Approved, self.persistent.as_mut());
        self.publish_metrics();
        self.draft
            .as_ref()
            .and_then(DraftWorkflow::current)
            .ok_or(CoreError::NoSelection)
    }

    pub async fn reject_draft(
        &mut self,
        reason: Option<String>,
    ) -> Result<&FollowUpDraft, CoreError> {
        let workflow = self.draft.as_mut().ok_or(CoreError::NoSelection)?;
        workflow
            .reject(self.service.as_ref(), &self.bus, reason)
            .await?;
        self.metrics.record_draft(DraftEvent::Rejected, self.persistent.as_mut());
        self.publish_metrics();
        self.draft
            .as_ref()
            .and_then(DraftWorkflow::current)
            .ok_or(CoreError::NoSelection)
    }

    /// Cooperative scheduler check; the runtime calls this on the tick
    /// cadence. A due tick releases at most one deferred alert and refreshes
    /// lightweight status.
    pub async fn autonomous_tick(&mut self, now: OffsetDateTime) -> Result<TickOutcome, CoreError> {
        let mut effects = SessionScanEffects {
            service: self.service.as_ref(),
            feed: &mut self.feed,
            bus: &self.bus,
            health: &mut self.health,
            now,
        };
        self.scheduler
            .tick(
                now,
                self.persistent.as_mut(),
                self.session_store.as_mut(),
                &mut effects,
            )
            .await
    }

    /// Forces a full scan, re-arms the schedule, records the run summary,
    /// and refreshes the queue from the enlarged pool.
    pub async fn run_manual_scan(&mut self, now: OffsetDateTime) -> Result<RunSummary, CoreError> {
        let summary = {
            let mut effects = SessionScanEffects {
                service: self.service.as_ref(),
                feed: &mut self.feed,
                bus: &self.bus,
                health: &mut self.health,
                now,
            };
            self.scheduler
                .run_manual(now, self.persistent.as_mut(), &mut effects)
                .await?
        };

        self.metrics.record_run(summary.clone());
        self.bus.publish(ConsoleEvent::ScanCompleted(ScanCompletedPayload {
            run_id: summary.run_id.clone(),
            created_alerts_count: summary.created_alerts_count,
            manual: true,
        }));
        self.refresh_alerts(now).await?;
        self.publish_metrics();
        Ok(summary)
    }

    /// Recomputes the performance snapshot from the current counters and
    /// queue size.
    pub fn performance(&mut self) -> PerformanceSnapshot {
        self.publish_metrics()
    }

    fn publish_metrics(&mut self) -> PerformanceSnapshot {
        let snapshot = self
            .metrics
            .refresh(self.feed.visible_len(), self.persistent.as_mut());
        self.bus.publish(ConsoleEvent::MetricsUpdated(MetricsUpdatedPayload {
            snapshot,
        }));
        snapshot
    }
}

/// Scheduler side effects wired to this session's feed, bus, and service.
struct SessionScanEffects<'a> {
    service: &'a dyn AdvisorService,
    feed: &'a mut QueueFeedController,
    bus: &'a ConsoleEventBus,
    health: &'a mut Option<HealthStatus>,
    now: OffsetDateTime,
}

#[async_trait::async_trait]
impl ScanEffects for SessionScanEffects<'_> {
    async fn release_deferred(&mut self) -> Result<(), CoreError> {
        if let Some(alert) = self.feed.release_next_deferred(self.now) {
            self.bus
                .publish(ConsoleEvent::DeferredReleased(DeferredReleasedPayload {
                    alert_id: alert.id,
                    released_at: self.now,
                }));
        }
        Ok(())
    }

    async fn refresh_health(&mut self) -> Result<(), CoreError> {
        *self.health = Some(self.service.health().await?);
        Ok(())
    }

    async fn run_full_scan(&mut self) -> Result<RunSummary, CoreError> {
        // Manual runs are forced, so no freshness window applies.
        self.service.run_scan(true, None).await
    }
}
