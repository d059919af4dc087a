//! Port onto the external alert/plan/draft/session service.
//!
//! All calls are request/response. This layer performs no retries: a failed
//! call surfaces a [`CoreError::Service`] and leaves local state unchanged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use sentinel_domain::{
    AlertDetail, AlertId, AlertStatus, AlertSummary, DraftId, FollowUpDraft, HealthStatus, PlanId,
    Priority, ReallocationPlan, RunSummary, TriageAction,
};

use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlertQuery {
    pub priorities: Vec<Priority>,
    pub statuses: Vec<AlertStatus>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl AlertQuery {
    pub fn open_alerts(limit: u32) -> Self {
        Self {
            priorities: Vec::new(),
            statuses: vec![AlertStatus::Open],
            limit: Some(limit),
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPage {
    pub items: Vec<AlertSummary>,
    pub total: u32,
}

#[async_trait]
pub trait AdvisorService: Send + Sync {
    async fn list_alerts(&self, query: AlertQuery) -> Result<AlertPage, CoreError>;
    async fn get_alert(&self, alert_id: AlertId) -> Result<AlertDetail, CoreError>;
    async fn apply_triage_action(
        &self,
        alert_id: AlertId,
        action: TriageAction,
    ) -> Result<AlertDetail, CoreError>;

    async fn generate_plan(
        &self,
        alert_id: AlertId,
        target_cash_amount: f64,
    ) -> Result<ReallocationPlan, CoreError>;
    async fn queue_plan(&self, plan_id: &PlanId) -> Result<ReallocationPlan, CoreError>;
    async fn approve_plan(&self, plan_id: &PlanId) -> Result<ReallocationPlan, CoreError>;
    async fn execute_plan(&self, plan_id: &PlanId) -> Result<ReallocationPlan, CoreError>;

    async fn create_draft(
        &self,
        alert_id: AlertId,
        force_regenerate: bool,
    ) -> Result<FollowUpDraft, CoreError>;
    async fn approve_draft(&self, draft_id: &DraftId) -> Result<FollowUpDraft, CoreError>;
    async fn reject_draft(
        &self,
        draft_id: &DraftId,
        reason: Option<String>,
    ) -> Result<FollowUpDraft, CoreError>;

    async fn health(&self) -> Result<HealthStatus, CoreError>;
    /// Triggers a scan run. With `force` unset the service may skip the run
    /// when the previous one completed within `max_age`, answering with an
    /// empty summary.
    async fn run_scan(
        &self,
        force: bool,
        max_age: Option<time::Duration>,
    ) -> Result<RunSummary, CoreError>;
}
