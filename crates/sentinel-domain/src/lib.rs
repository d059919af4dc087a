//! Domain model for the advisor triage console: alerts, plans, drafts,
//! run summaries, and the pure policy functions that order them.

pub mod alert;
pub mod draft;
pub mod identifiers;
pub mod ordering;
pub mod performance;
pub mod plan;
pub mod run;

pub use alert::{
    AlertDetail, AlertStatus, AlertSummary, ChangeDetectionRow, ClientSummary, DecisionTraceStep,
    PortfolioSummary, Priority, RiskMetrics, TriageAction,
};
pub use draft::{DraftStatus, FollowUpDraft};
pub use identifiers::{AlertId, ClientId, DraftId, PlanId, PortfolioId, RunId};
pub use ordering::{dedupe_alerts, rank_alerts, ranked};
pub use performance::{
    derive_performance, DraftEvent, PerformanceBaseline, PerformanceSnapshot, SessionCounters,
};
pub use plan::{PlanAlternative, PlanStatus, PlanTrade, ReallocationPlan, TradeAction};
pub use run::{HealthStatus, RunSummary};
