//! Generic forward-only approval engine and its two instantiations:
//! reallocation plans (PLANNED → QUEUED → APPROVED → EXECUTED) and
//! follow-up drafts (PENDING_APPROVAL → APPROVED_READY / REJECTED).
//!
//! Transitions are table-driven: each action names its single allowed
//! predecessor. An action attempted from any other state is rejected and
//! leaves state unchanged, so no stage can be skipped or reversed. The
//! engine never advances on its own; every transition is an explicit human
//! action.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::warn;

use sentinel_domain::{AlertId, DraftStatus, FollowUpDraft, PlanStatus, ReallocationPlan};

use crate::adapters::AdvisorService;
use crate::bus::ConsoleEventBus;
use crate::error::CoreError;
use crate::events::{ConsoleEvent, DraftTransitionPayload, PlanTransitionPayload};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("action '{action}' is not allowed from state '{from}'")]
    InvalidTransition { from: String, action: String },
}

impl TransitionError {
    fn invalid(from: impl fmt::Debug, action: impl fmt::Debug) -> Self {
        Self::InvalidTransition {
            from: format!("{from:?}"),
            action: format!("{action:?}"),
        }
    }
}

/// Holds a busy/in-flight flag set for exactly as long as the guard lives.
/// Dropping the guard clears the flag, so a future abandoned at an await
/// point cannot leave its owner wedged busy.
pub(crate) struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    pub(crate) fn arm(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Relaxed);
        Self { flag }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Relaxed);
    }
}

pub trait Stage: Copy + Eq + fmt::Debug {
    fn is_terminal(self) -> bool;
}

impl Stage for PlanStatus {
    fn is_terminal(self) -> bool {
        PlanStatus::is_terminal(self)
    }
}

impl Stage for DraftStatus {
    fn is_terminal(self) -> bool {
        DraftStatus::is_terminal(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule<S, A> {
    pub action: A,
    pub from: S,
    pub to: S,
}

#[derive(Debug, Clone, Copy)]
pub struct ApprovalMachine<S: 'static, A: 'static> {
    rules: &'static [TransitionRule<S, A>],
}

impl<S: Stage, A: Copy + Eq + fmt::Debug> ApprovalMachine<S, A> {
    pub const fn new(rules: &'static [TransitionRule<S, A>]) -> Self {
        Self { rules }
    }

    /// Resolves the successor state for `action` from `from`, or rejects the
    /// transition without touching any state.
    pub fn next(&self, from: S, action: A) -> Result<S, TransitionError> {
        if from.is_terminal() {
            return Err(TransitionError::invalid(from, action));
        }
        self.rules
            .iter()
            .find(|rule| rule.action == action && rule.from == from)
            .map(|rule| rule.to)
            .ok_or_else(|| TransitionError::invalid(from, action))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    Generate,
    Queue,
    Approve,
    Execute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftAction {
    Create,
    Approve,
    Reject,
}

const PLAN_RULES: &[TransitionRule<PlanStatus, PlanAction>] = &[
    TransitionRule {
        action: PlanAction::Queue,
        from: PlanStatus::Planned,
        to: PlanStatus::Queued,
    },
    TransitionRule {
        action: PlanAction::Approve,
        from: PlanStatus::Queued,
        to: PlanStatus::Approved,
    },
    TransitionRule {
        action: PlanAction::Execute,
        from: PlanStatus::Approved,
        to: PlanStatus::Executed,
    },
];

const DRAFT_RULES: &[TransitionRule<DraftStatus, DraftAction>] = &[
    TransitionRule {
        action: DraftAction::Approve,
        from: DraftStatus::PendingApproval,
        to: DraftStatus::ApprovedReady,
    },
    TransitionRule {
        action: DraftAction::Reject,
        from: DraftStatus::PendingApproval,
        to: DraftStatus::Rejected,
    },
];

pub static PLAN_MACHINE: ApprovalMachine<PlanStatus, PlanAction> = ApprovalMachine::new(PLAN_RULES);
pub static DRAFT_MACHINE: ApprovalMachine<DraftStatus, DraftAction> =
    ApprovalMachine::new(DRAFT_RULES);

/// In-memory reallocation-plan workflow scoped to one selected alert. The
/// authoritative plan lives externally; this instance is discarded when the
/// selection changes.
#[derive(Debug)]
pub struct PlanWorkflow {
    alert_id: AlertId,
    instance: Option<ReallocationPlan>,
    busy: AtomicBool,
}

impl PlanWorkflow {
    pub fn new(alert_id: AlertId) -> Self {
        Self {
            alert_id,
            instance: None,
            busy: AtomicBool::new(false),
        }
    }

    pub fn alert_id(&self) -> AlertId {
        self.alert_id
    }

    pub fn current(&self) -> Option<&ReallocationPlan> {
        self.instance.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Relaxed)
    }

    /// Generates a plan, or regenerates one that is still PLANNED. A
    /// regeneration discards the previous instance wholesale.
    pub async fn generate(
        &mut self,
        service: &dyn AdvisorService,
        bus: &ConsoleEventBus,
        target_cash_amount: f64,
        regenerate: bool,
    ) -> Result<&ReallocationPlan, CoreError> {
        if self.is_busy() {
            return Err(CoreError::Busy);
        }
        if let Some(existing) = &self.instance {
            if !regenerate || existing.status != PlanStatus::Planned {
                return Err(TransitionError::invalid(existing.status, PlanAction::Generate).into());
            }
        }

        let _submitting = BusyGuard::arm(&self.busy);
        let plan = service.generate_plan(self.alert_id, target_cash_amount).await?;
        if plan.alert_id != self.alert_id {
            return Err(CoreError::StaleSelection);
        }

        let from = self.instance.as_ref().map(|existing| existing.status);
        bus.publish(ConsoleEvent::PlanTransition(PlanTransitionPayload {
            plan_id: plan.plan_id.clone(),
            alert_id: self.alert_id,
            from,
            to: plan.status,
        }));
        Ok(self.instance.insert(plan))
    }

    pub async fn queue(
        &mut self,
        service: &dyn AdvisorService,
        bus: &ConsoleEventBus,
    ) -> Result<&ReallocationPlan, CoreError> {
        self.transition(service, bus, PlanAction::Queue).await
    }

    pub async fn approve(
        &mut self,
        service: &dyn AdvisorService,
        bus: &ConsoleEventBus,
    ) -> Result<&ReallocationPlan, CoreError> {
        self.transition(service, bus, PlanAction::Approve).await
    }

    pub async fn execute(
        &mut self,
        service: &dyn AdvisorService,
        bus: &ConsoleEventBus,
    ) -> Result<&ReallocationPlan, CoreError> {
        self.transition(service, bus, PlanAction::Execute).await
    }

    async fn transition(
        &mut self,
        service: &dyn AdvisorService,
        bus: &ConsoleEventBus,
        action: PlanAction,
    ) -> Result<&ReallocationPlan, CoreError> {
        if self.is_busy() {
            return Err(CoreError::Busy);
        }
        let current = self
            .instance
            .as_ref()
            .ok_or_else(|| TransitionError::invalid(None::<PlanStatus>, action))?;
        let expected = PLAN_MACHINE.next(current.status, action)?;
        let from = current.status;
        let plan_id = current.plan_id.clone();

        let _submitting = BusyGuard::arm(&self.busy);
        let updated = match action {
            PlanAction::Queue => service.queue_plan(&plan_id).await,
            PlanAction::Approve => service.approve_plan(&plan_id).await,
            PlanAction::Execute => service.execute_plan(&plan_id).await,
            PlanAction::Generate => unreachable!("generate is handled separately"),
        }?;
        if updated.alert_id != self.alert_id {
            return Err(CoreError::StaleSelection);
        }
        if updated.status != expected {
            // The external state is authoritative; reflect it, don't invent.
            warn!(
                expected = ?expected,
                actual = ?updated.status,
                "plan transition response disagreed with the local table"
            );
        }

        bus.publish(ConsoleEvent::PlanTransition(PlanTransitionPayload {
            plan_id: updated.plan_id.clone(),
            alert_id: self.alert_id,
            from: Some(from),
            to: updated.status,
        }));
        Ok(self.instance.insert(updated))
    }
}

/// In-memory follow-up-draft workflow scoped to one selected alert.
#[derive(Debug)]
pub struct DraftWorkflow {
    alert_id: AlertId,
    instance: Option<FollowUpDraft>,
    busy: AtomicBool,
}

impl DraftWorkflow {
    pub fn new(alert_id: AlertId) -> Self {
        Self {
            alert_id,
            instance: None,
            busy: AtomicBool::new(false),
        }
    }

    pub fn alert_id(&self) -> AlertId {
        self.alert_id
    }

    pub fn current(&self) -> Option<&FollowUpDraft> {
        self.instance.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Relaxed)
    }

    /// Creates a draft. With `force_regenerate` the workflow restarts at
    /// PENDING_APPROVAL from any state, discarding prior approval or
    /// rejection.
    pub async fn create(
        &mut self,
        service: &dyn AdvisorService,
        bus: &ConsoleEventBus,
        force_regenerate: bool,
    ) -> Result<&FollowUpDraft, CoreError> {
        if self.is_busy() {
            return Err(CoreError::Busy);
        }
        if let Some(existing) = &self.instance {
            if !force_regenerate {
                return Err(TransitionError::invalid(existing.status, DraftAction::Create).into());
            }
        }

        let _submitting = BusyGuard::arm(&self.busy);
        let draft = service.create_draft(self.alert_id, force_regenerate).await?;
        if draft.alert_id != self.alert_id {
            return Err(CoreError::StaleSelection);
        }

        let from = self.instance.as_ref().map(|existing| existing.status);
        bus.publish(ConsoleEvent::DraftTransition(DraftTransitionPayload {
            draft_id: draft.draft_id.clone(),
            alert_id: self.alert_id,
            from,
            to: draft.status,
        }));
        Ok(self.instance.insert(draft))
    }

    pub async fn approve(
        &mut self,
        service: &dyn AdvisorService,
        bus: &ConsoleEventBus,
    ) -> Result<&FollowUpDraft, CoreError> {
        self.transition(service, bus, DraftAction::Approve, None).await
    }

    pub async fn reject(
        &mut self,
        service: &dyn AdvisorService,
        bus: &ConsoleEventBus,
        reason: Option<String>,
    ) -> Result<&FollowUpDraft, CoreError> {
        self.transition(service, bus, DraftAction::Reject, reason).await
    }

    async fn transition(
        &mut self,
        service: &dyn AdvisorService,
        bus: &ConsoleEventBus,
        action: DraftAction,
        reason: Option<String>,
    ) -> Result<&FollowUpDraft, CoreError> {
        if self.is_busy() {
            return Err(CoreError::Busy);
        }
        let current = self
            .instance
            .as_ref()
            .ok_or_else(|| TransitionError::invalid(None::<DraftStatus>, action))?;
        let expected = DRAFT_MACHINE.next(current.status, action)?;
        let from = current.status;
        let draft_id = current.draft_id.clone();

        let _submitting = BusyGuard::arm(&self.busy);
        let updated = match action {
            DraftAction::Approve => service.approve_draft(&draft_id).await,
            DraftAction::Reject => service.reject_draft(&draft_id, reason).await,
            DraftAction::Create => unreachable!("create is handled separately"),
        }?;
        if updated.alert_id != self.alert_id {
            return Err(CoreError::StaleSelection);
        }
        if updated.status != expected {
            warn!(
                expected = ?expected,
                actual = ?updated.status,
                "draft transition response disagreed with the local table"
            );
        }

        bus.publish(ConsoleEvent::DraftTransition(DraftTransitionPayload {
            draft_id: updated.draft_id.clone(),
            alert_id: self.alert_id,
            from: Some(from),
            to: updated.status,
        }));
        Ok(self.instance.insert(updated))
    }
}
