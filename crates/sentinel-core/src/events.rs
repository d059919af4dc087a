use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use sentinel_domain::{
    AlertId, DraftId, DraftStatus, PerformanceSnapshot, PlanId, PlanStatus, RunId, TriageAction,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertsIngestedPayload {
    pub epoch: u64,
    pub visible_count: usize,
    pub deferred_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRevealedPayload {
    pub epoch: u64,
    pub alert_id: AlertId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredReleasedPayload {
    pub alert_id: AlertId,
    #[serde(with = "time::serde::rfc3339")]
    pub released_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertTriagedPayload {
    pub alert_id: AlertId,
    pub action: TriageAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTransitionPayload {
    pub plan_id: PlanId,
    pub alert_id: AlertId,
    pub from: Option<PlanStatus>,
    pub to: PlanStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftTransitionPayload {
    pub draft_id: DraftId,
    pub alert_id: AlertId,
    pub from: Option<DraftStatus>,
    pub to: DraftStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanCompletedPayload {
    pub run_id: RunId,
    pub created_alerts_count: u32,
    pub manual: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsUpdatedPayload {
    pub snapshot: PerformanceSnapshot,
}

/// Domain events emitted by the controllers and state machines, consumed by
/// whatever renders the console. The core never talks to a view directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConsoleEvent {
    AlertsIngested(AlertsIngestedPayload),
    AlertRevealed(AlertRevealedPayload),
    DeferredReleased(DeferredReleasedPayload),
    AlertTriaged(AlertTriagedPayload),
    PlanTransition(PlanTransitionPayload),
    DraftTransition(DraftTransitionPayload),
    ScanCompleted(ScanCompletedPayload),
    MetricsUpdated(MetricsUpdatedPayload),
}
