//! Deterministic in-process stand-in for the external advisor service, plus
//! alert fixtures. Ships outside `cfg(test)` so demos and downstream
//! integration tests can run the full console without a backend.
//!
//! All derived figures are pure functions of the inputs (ticker names,
//! portfolio values, target amounts), so repeated calls with the same
//! arguments produce the same plans and drafts apart from freshly assigned
//! ids and timestamps.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use time::macros::format_description;
use time::{Duration, OffsetDateTime};

use sentinel_domain::{
    AlertDetail, AlertId, AlertStatus, AlertSummary, ChangeDetectionRow, ClientId, ClientSummary,
    DecisionTraceStep, DraftId, DraftStatus, FollowUpDraft, HealthStatus, PlanAlternative, PlanId,
    PlanStatus, PlanTrade, PortfolioId, PortfolioSummary, Priority, ReallocationPlan, RiskMetrics,
    RunId, RunSummary, TradeAction, TriageAction,
};

use crate::adapters::{AdvisorService, AlertPage, AlertQuery};
use crate::approval::TransitionError;
use crate::error::CoreError;

const PROVIDER: &str = "mock";
const TAX_INCLUSION_RATE: f64 = 0.50;
const MARGINAL_TAX_RATE: f64 = 0.38;
const SETTLEMENT_DAYS: u32 = 2;

/// Non-cash holdings every mock portfolio liquidates from, in order.
const HOLDINGS: &[(&str, &str, f64)] = &[
    ("VEQT", "Equity", 0.45),
    ("XIC", "Equity", 0.20),
    ("ZAG", "Fixed Income", 0.25),
];

const EVENT_TITLES: &[&str] = &[
    "Allocation drift beyond tolerance",
    "Concentration risk in single issuer",
    "Cash shortfall against upcoming withdrawal",
    "Volatility spike in equity sleeve",
    "Rebalance window approaching",
];

fn class_volatility(asset_class: &str) -> f64 {
    match asset_class {
        "Equity" => 0.16,
        "Fixed Income" => 0.07,
        _ => 0.01,
    }
}

fn char_sum(value: &str) -> u32 {
    value.chars().map(|c| c as u32).sum()
}

/// Deterministic pseudo-price seeded from the ticker name.
fn estimate_unit_price(ticker: &str) -> f64 {
    f64::from(char_sum(ticker) % 35 + 40)
}

/// Deterministic embedded-gain rate seeded from the ticker name.
fn estimate_gain_rate(ticker: &str) -> f64 {
    f64::from(char_sum(ticker) % 20) / 100.0 + 0.05
}

/// Builds `count` open alerts with cycling priorities and timestamps spaced
/// one minute apart, newest first by id.
pub fn fixture_alerts(count: usize, base_time: OffsetDateTime) -> Vec<AlertSummary> {
    (0..count)
        .map(|index| {
            let priority = match index % 3 {
                0 => Priority::High,
                1 => Priority::Medium,
                _ => Priority::Low,
            };
            let client_number = index % 7 + 1;
            AlertSummary {
                id: AlertId(index as i64 + 1),
                created_at: base_time - Duration::minutes(index as i64),
                priority,
                confidence: (62 + (index * 7) % 36) as u8,
                event_title: EVENT_TITLES[index % EVENT_TITLES.len()].to_owned(),
                summary: format!(
                    "{} for portfolio {}",
                    EVENT_TITLES[index % EVENT_TITLES.len()],
                    index + 1
                ),
                status: AlertStatus::Open,
                client: ClientSummary {
                    id: ClientId::new(format!("client-{client_number:03}")),
                    name: format!("Client {client_number}"),
                    email: format!("client{client_number}@example.com"),
                    segment: "core".to_owned(),
                    risk_profile: "balanced".to_owned(),
                },
                portfolio: PortfolioSummary {
                    id: PortfolioId::new(format!("portfolio-{client_number:03}")),
                    name: format!("Balanced Growth {client_number}"),
                    total_value: 400_000.0 + index as f64 * 25_000.0,
                    target_equity_pct: 60.0,
                    target_fixed_income_pct: 30.0,
                    target_cash_pct: 10.0,
                },
                recently_arrived: false,
            }
        })
        .collect()
}

#[derive(Debug, Default)]
struct MockState {
    alerts: Vec<AlertSummary>,
    plans: Vec<ReallocationPlan>,
    drafts: Vec<FollowUpDraft>,
    next_plan: u32,
    next_draft: u32,
    next_run: u32,
    fail_next: Option<String>,
    last_run_completed_at: Option<OffsetDateTime>,
}

#[derive(Debug, Default)]
pub struct MockAdvisorService {
    state: Mutex<MockState>,
}

impl MockAdvisorService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alerts(alerts: Vec<AlertSummary>) -> Self {
        let service = Self::new();
        service.state().alerts = alerts;
        service
    }

    pub fn with_fixture_alerts(count: usize) -> Self {
        Self::with_alerts(fixture_alerts(count, OffsetDateTime::now_utc()))
    }

    /// Arms a one-shot transport failure for the next service call.
    pub fn fail_next_call(&self, message: impl Into<String>) {
        self.state().fail_next = Some(message.into());
    }

    pub fn first_alert_id(&self) -> AlertId {
        self.state()
            .alerts
            .first()
            .map(|alert| alert.id)
            .unwrap_or(AlertId(0))
    }

    pub fn alert_count(&self) -> usize {
        self.state().alerts.len()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn take_failure(state: &mut MockState) -> Result<(), CoreError> {
    match state.fail_next.take() {
        Some(message) => Err(CoreError::service(message)),
        None => Ok(()),
    }
}

fn alert_detail(summary: AlertSummary) -> AlertDetail {
    let drift = f64::from(summary.confidence) / 10.0;
    AlertDetail {
        reasoning_bullets: vec![
            format!("{} flagged by the drift monitor", summary.event_title),
            format!("Confidence {} from converging signals", summary.confidence),
        ],
        human_review_required: summary.priority == Priority::High,
        suggested_next_step: "Review the portfolio and generate a reallocation plan".to_owned(),
        decision_trace_steps: vec![
            DecisionTraceStep {
                step: "signal".to_owned(),
                detail: summary.event_title.clone(),
            },
            DecisionTraceStep {
                step: "threshold".to_owned(),
                detail: format!("confidence {} above alerting floor", summary.confidence),
            },
        ],
        change_detection: vec![ChangeDetectionRow {
            metric: "allocation_drift_pct".to_owned(),
            from: "1.2".to_owned(),
            to: format!("{drift:.1}"),
        }],
        metrics: RiskMetrics {
            concentration_score: 0.42,
            drift_score: drift,
            volatility_proxy: 0.14,
            risk_score: f64::from(summary.confidence) / 100.0,
        },
        summary,
    }
}

fn find_alert(state: &MockState, alert_id: AlertId) -> Result<AlertSummary, CoreError> {
    state
        .alerts
        .iter()
        .find(|alert| alert.id == alert_id)
        .cloned()
        .ok_or_else(|| CoreError::service(format!("alert {alert_id} not found")))
}

fn build_plan(
    plan_id: PlanId,
    alert: &AlertSummary,
    target_cash_amount: f64,
    now: OffsetDateTime,
) -> ReallocationPlan {
    let portfolio = &alert.portfolio;
    let current_cash_amount = portfolio.total_value * portfolio.target_cash_pct / 100.0;
    let additional_cash_needed = (target_cash_amount - current_cash_amount).max(0.0);

    let mut trades = Vec::new();
    let mut remaining = additional_cash_needed;
    let mut total_gains = 0.0;
    let mut total_tax = 0.0;
    for (ticker, asset_class, weight) in HOLDINGS {
        if remaining <= 0.0 {
            break;
        }
        let held_value = portfolio.total_value * weight;
        let amount = remaining.min(held_value);
        let gain = amount * estimate_gain_rate(ticker);
        let tax = gain * TAX_INCLUSION_RATE * MARGINAL_TAX_RATE;
        total_gains += gain;
        total_tax += tax;
        trades.push(PlanTrade {
            ticker: (*ticker).to_owned(),
            asset_class: (*asset_class).to_owned(),
            action: TradeAction::Sell,
            amount,
            estimated_units: amount / estimate_unit_price(ticker),
            settlement_days: SETTLEMENT_DAYS,
            estimated_gain_realized: gain,
            estimated_tax_cost: tax,
        });
        remaining -= amount;
    }

    let volatility_before: f64 = HOLDINGS
        .iter()
        .map(|(_, asset_class, weight)| class_volatility(asset_class) * weight)
        .sum::<f64>()
        + class_volatility("Cash") * 0.10;
    let sold_fraction = if portfolio.total_value > 0.0 {
        (additional_cash_needed - remaining) / portfolio.total_value
    } else {
        0.0
    };
    // Every dollar sold moves from its asset class into cash.
    let volatility_after = (volatility_before
        - sold_fraction * (class_volatility("Equity") - class_volatility("Cash")))
    .max(class_volatility("Cash"));
    let volatility_reduction_pct = if volatility_before > 0.0 {
        (volatility_before - volatility_after) / volatility_before * 100.0
    } else {
        0.0
    };

    ReallocationPlan {
        plan_id,
        alert_id: alert.id,
        status: PlanStatus::Planned,
        generated_at: now,
        target_cash_amount,
        current_cash_amount,
        additional_cash_needed,
        estimated_realized_gains: total_gains,
        estimated_tax_impact: total_tax,
        volatility_before,
        volatility_after,
        volatility_reduction_pct,
        liquidity_days: SETTLEMENT_DAYS,
        trades,
        alternatives_considered: vec![
            PlanAlternative {
                name: "Sell equities pro-rata".to_owned(),
                estimated_tax_impact: total_tax * 1.4,
                estimated_liquidity_days: 2,
                volatility_after: volatility_after * 1.1,
                rejected_reason: "Realizes more embedded gains than necessary".to_owned(),
            },
            PlanAlternative {
                name: "Draw on margin".to_owned(),
                estimated_tax_impact: 0.0,
                estimated_liquidity_days: 1,
                volatility_after: volatility_before,
                rejected_reason: "Adds leverage against the client's risk profile".to_owned(),
            },
            PlanAlternative {
                name: "Wait for scheduled contributions".to_owned(),
                estimated_tax_impact: 0.0,
                estimated_liquidity_days: 30,
                volatility_after: volatility_before,
                rejected_reason: "Misses the withdrawal date".to_owned(),
            },
        ],
        rationale: format!(
            "Raise cash to {target_cash_amount:.0} by selling the lowest-gain lots first, \
             keeping realized gains near {total_gains:.0}"
        ),
        queued_at: None,
        approved_at: None,
        approved_by: None,
        executed_at: None,
        execution_reference: None,
    }
}

fn plan_transition(
    state: &mut MockState,
    plan_id: &PlanId,
    expected_from: PlanStatus,
    to: PlanStatus,
    action: &str,
) -> Result<ReallocationPlan, CoreError> {
    let plan = state
        .plans
        .iter_mut()
        .find(|plan| &plan.plan_id == plan_id)
        .ok_or_else(|| CoreError::service(format!("plan {} not found", plan_id.as_str())))?;

    // Re-posting a transition the plan already took is idempotent.
    if plan.status == to {
        return Ok(plan.clone());
    }
    if plan.status != expected_from {
        return Err(TransitionError::InvalidTransition {
            from: format!("{:?}", plan.status),
            action: action.to_owned(),
        }
        .into());
    }

    let now = OffsetDateTime::now_utc();
    plan.status = to;
    match to {
        PlanStatus::Queued => plan.queued_at = Some(now),
        PlanStatus::Approved => {
            plan.approved_at = Some(now);
            plan.approved_by = Some("advisor@console".to_owned());
        }
        PlanStatus::Executed => {
            plan.executed_at = Some(now);
            let stamp = now
                .format(format_description!(
                    "[year][month][day][hour][minute][second]"
                ))
                .map_err(|error| {
                    CoreError::service(format!("failed to format execution stamp: {error}"))
                })?;
            plan.execution_reference = Some(format!("SIM-{}-{stamp}", plan.plan_id.as_str()));
        }
        PlanStatus::Planned => {}
    }
    Ok(plan.clone())
}

fn draft_transition(
    state: &mut MockState,
    draft_id: &DraftId,
    to: DraftStatus,
    reason: Option<String>,
    action: &str,
) -> Result<FollowUpDraft, CoreError> {
    let draft = state
        .drafts
        .iter_mut()
        .find(|draft| &draft.draft_id == draft_id)
        .ok_or_else(|| CoreError::service(format!("draft {} not found", draft_id.as_str())))?;

    if draft.status == to {
        return Ok(draft.clone());
    }
    if draft.status != DraftStatus::PendingApproval {
        return Err(TransitionError::InvalidTransition {
            from: format!("{:?}", draft.status),
            action: action.to_owned(),
        }
        .into());
    }

    draft.status = to;
    match to {
        DraftStatus::ApprovedReady => {
            draft.approved_by = Some("advisor@console".to_owned());
            draft.approved_at = Some(OffsetDateTime::now_utc());
        }
        DraftStatus::Rejected => draft.rejection_reason = reason,
        DraftStatus::PendingApproval => {}
    }
    Ok(draft.clone())
}

#[async_trait]
impl AdvisorService for MockAdvisorService {
    async fn list_alerts(&self, query: AlertQuery) -> Result<AlertPage, CoreError> {
        let mut state = self.state();
        take_failure(&mut state)?;

        let filtered: Vec<AlertSummary> = state
            .alerts
            .iter()
            .filter(|alert| query.statuses.is_empty() || query.statuses.contains(&alert.status))
            .filter(|alert| {
                query.priorities.is_empty() || query.priorities.contains(&alert.priority)
            })
            .cloned()
            .collect();
        let total = filtered.len() as u32;
        let items = filtered
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit.map(|limit| limit as usize).unwrap_or(usize::MAX))
            .collect();
        Ok(AlertPage { items, total })
    }

    async fn get_alert(&self, alert_id: AlertId) -> Result<AlertDetail, CoreError> {
        let mut state = self.state();
        take_failure(&mut state)?;
        Ok(alert_detail(find_alert(&state, alert_id)?))
    }

    async fn apply_triage_action(
        &self,
        alert_id: AlertId,
        action: TriageAction,
    ) -> Result<AlertDetail, CoreError> {
        let mut state = self.state();
        take_failure(&mut state)?;

        let status = action.resulting_status();
        let alert = state
            .alerts
            .iter_mut()
            .find(|alert| alert.id == alert_id)
            .ok_or_else(|| CoreError::service(format!("alert {alert_id} not found")))?;
        alert.status = status;
        Ok(alert_detail(alert.clone()))
    }

    async fn generate_plan(
        &self,
        alert_id: AlertId,
        target_cash_amount: f64,
    ) -> Result<ReallocationPlan, CoreError> {
        let mut state = self.state();
        take_failure(&mut state)?;

        let alert = find_alert(&state, alert_id)?;
        state.next_plan += 1;
        let plan_id = PlanId::new(format!("plan-{:04}", state.next_plan));
        let plan = build_plan(plan_id, &alert, target_cash_amount, OffsetDateTime::now_utc());
        state.plans.push(plan.clone());
        Ok(plan)
    }

    async fn queue_plan(&self, plan_id: &PlanId) -> Result<ReallocationPlan, CoreError> {
        let mut state = self.state();
        take_failure(&mut state)?;
        plan_transition(&mut state, plan_id, PlanStatus::Planned, PlanStatus::Queued, "queue")
    }

    async fn approve_plan(&self, plan_id: &PlanId) -> Result<ReallocationPlan, CoreError> {
        let mut state = self.state();
        take_failure(&mut state)?;
        plan_transition(
            &mut state,
            plan_id,
            PlanStatus::Queued,
            PlanStatus::Approved,
            "approve",
        )
    }

    async fn execute_plan(&self, plan_id: &PlanId) -> Result<ReallocationPlan, CoreError> {
        let mut state = self.state();
        take_failure(&mut state)?;
        plan_transition(
            &mut state,
            plan_id,
            PlanStatus::Approved,
            PlanStatus::Executed,
            "execute",
        )
    }

    async fn create_draft(
        &self,
        alert_id: AlertId,
        force_regenerate: bool,
    ) -> Result<FollowUpDraft, CoreError> {
        let mut state = self.state();
        take_failure(&mut state)?;

        if !force_regenerate {
            let pending = state.drafts.iter().find(|draft| {
                draft.alert_id == alert_id && draft.status == DraftStatus::PendingApproval
            });
            if let Some(existing) = pending {
                return Ok(existing.clone());
            }
        }

        let alert = find_alert(&state, alert_id)?;
        state.next_draft += 1;
        let draft = FollowUpDraft {
            draft_id: DraftId::new(format!("draft-{:04}", state.next_draft)),
            alert_id,
            client_id: alert.client.id.clone(),
            status: DraftStatus::PendingApproval,
            recipient_email: alert.client.email.clone(),
            subject: format!("Portfolio update: {}", alert.event_title),
            body: format!(
                "Hi {},\n\nWe noticed the following on your portfolio: {}. \
                 Your advisor has reviewed it and will follow up with next steps.\n",
                alert.client.name, alert.summary
            ),
            generation_provider: PROVIDER.to_owned(),
            rejection_reason: None,
            approved_by: None,
            approved_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        state.drafts.push(draft.clone());
        Ok(draft)
    }

    async fn approve_draft(&self, draft_id: &DraftId) -> Result<FollowUpDraft, CoreError> {
        let mut state = self.state();
        take_failure(&mut state)?;
        draft_transition(&mut state, draft_id, DraftStatus::ApprovedReady, None, "approve")
    }

    async fn reject_draft(
        &self,
        draft_id: &DraftId,
        reason: Option<String>,
    ) -> Result<FollowUpDraft, CoreError> {
        let mut state = self.state();
        take_failure(&mut state)?;
        draft_transition(&mut state, draft_id, DraftStatus::Rejected, reason, "reject")
    }

    async fn health(&self) -> Result<HealthStatus, CoreError> {
        let mut state = self.state();
        take_failure(&mut state)?;
        Ok(HealthStatus {
            last_run_completed_at: state.last_run_completed_at,
            provider: PROVIDER.to_owned(),
            degraded: false,
        })
    }

    async fn run_scan(
        &self,
        force: bool,
        max_age: Option<Duration>,
    ) -> Result<RunSummary, CoreError> {
        let mut state = self.state();
        take_failure(&mut state)?;

        let now = OffsetDateTime::now_utc();
        if !force {
            if let (Some(completed_at), Some(max_age)) = (state.last_run_completed_at, max_age) {
                if now - completed_at <= max_age {
                    state.next_run += 1;
                    return Ok(RunSummary::empty(
                        RunId::new(format!("run-{:04}", state.next_run)),
                        PROVIDER,
                    ));
                }
            }
        }
        let next_id = state
            .alerts
            .iter()
            .map(|alert| alert.id.value())
            .max()
            .unwrap_or(0)
            + 1;
        let mut created = fixture_alerts(2, now);
        for (index, alert) in created.iter_mut().enumerate() {
            alert.id = AlertId(next_id + index as i64);
            alert.created_at = now;
        }
        state.alerts.extend(created.clone());
        state.last_run_completed_at = Some(now);
        state.next_run += 1;

        let mut priority_counts: BTreeMap<Priority, u32> = BTreeMap::new();
        for alert in &created {
            *priority_counts.entry(alert.priority).or_insert(0) += 1;
        }
        Ok(RunSummary {
            run_id: RunId::new(format!("run-{:04}", state.next_run)),
            provider_used: PROVIDER.to_owned(),
            created_alerts_count: created.len() as u32,
            priority_counts,
            top_alerts: created,
        })
    }
}
