use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::identifiers::{AlertId, ClientId, PortfolioId};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Sort rank: High sorts first.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Open,
    Reviewed,
    Escalated,
    FalsePositive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageAction {
    Reviewed,
    Escalate,
    FalsePositive,
}

impl TriageAction {
    /// Status the external source records once the action is applied.
    pub fn resulting_status(self) -> AlertStatus {
        match self {
            Self::Reviewed => AlertStatus::Reviewed,
            Self::Escalate => AlertStatus::Escalated,
            Self::FalsePositive => AlertStatus::FalsePositive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSummary {
    pub id: ClientId,
    pub name: String,
    pub email: String,
    pub segment: String,
    pub risk_profile: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub id: PortfolioId,
    pub name: String,
    pub total_value: f64,
    pub target_equity_pct: f64,
    pub target_fixed_income_pct: f64,
    pub target_cash_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub id: AlertId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub priority: Priority,
    pub confidence: u8,
    pub event_title: String,
    pub summary: String,
    pub status: AlertStatus,
    pub client: ClientSummary,
    pub portfolio: PortfolioSummary,
    /// Set when the alert was released into the queue mid-session and the
    /// advisor has not opened it yet.
    #[serde(default)]
    pub recently_arrived: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTraceStep {
    pub step: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeDetectionRow {
    pub metric: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub concentration_score: f64,
    pub drift_score: f64,
    pub volatility_proxy: f64,
    pub risk_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDetail {
    pub summary: AlertSummary,
    pub reasoning_bullets: Vec<String>,
    pub human_review_required: bool,
    pub suggested_next_step: String,
    pub decision_trace_steps: Vec<DecisionTraceStep>,
    pub change_detection: Vec<ChangeDetectionRow>,
    pub metrics: RiskMetrics,
}
