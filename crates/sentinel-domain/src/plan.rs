use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::identifiers::{AlertId, PlanId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Planned,
    Queued,
    Approved,
    Executed,
}

impl PlanStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Executed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    Sell,
    Buy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTrade {
    pub ticker: String,
    pub asset_class: String,
    pub action: TradeAction,
    pub amount: f64,
    pub estimated_units: f64,
    pub settlement_days: u32,
    pub estimated_gain_realized: f64,
    pub estimated_tax_cost: f64,
}

/// A liquidation strategy the planner considered and rejected, kept for the
/// advisor's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanAlternative {
    pub name: String,
    pub estimated_tax_impact: f64,
    pub estimated_liquidity_days: u32,
    pub volatility_after: f64,
    pub rejected_reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReallocationPlan {
    pub plan_id: PlanId,
    pub alert_id: AlertId,
    pub status: PlanStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub target_cash_amount: f64,
    pub current_cash_amount: f64,
    pub additional_cash_needed: f64,
    pub estimated_realized_gains: f64,
    pub estimated_tax_impact: f64,
    pub volatility_before: f64,
    pub volatility_after: f64,
    pub volatility_reduction_pct: f64,
    pub liquidity_days: u32,
    pub trades: Vec<PlanTrade>,
    pub alternatives_considered: Vec<PlanAlternative>,
    pub rationale: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub queued_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub approved_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub executed_at: Option<OffsetDateTime>,
    /// Simulated execution token, `SIM-<plan>-<yyyymmddHHMMSS>`. Present only
    /// once the plan reaches EXECUTED.
    #[serde(default)]
    pub execution_reference: Option<String>,
}
