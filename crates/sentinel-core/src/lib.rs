//! Triage and staged-approval orchestration for the advisor console.
//!
//! The core owns the visible alert queue and its staggered reveal, the
//! autonomous scan schedule, the two human-gated approval workflows
//! (reallocation plans and follow-up drafts), and the session performance
//! counters. Everything external (the alert/plan/draft service and the
//! key-value continuity store) sits behind ports defined here.

pub mod adapters;
pub mod approval;
pub mod bus;
pub mod error;
pub mod events;
pub mod feed;
pub mod metrics;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod test_support;

#[cfg(test)]
mod tests;

pub use adapters::{AdvisorService, AlertPage, AlertQuery};
pub use approval::{
    DraftAction, DraftWorkflow, PlanAction, PlanWorkflow, Stage, TransitionError, TransitionRule,
};
pub use bus::{ConsoleEventBus, ConsoleEventBusConfig, ConsoleEventEnvelope};
pub use error::CoreError;
pub use events::{
    AlertRevealedPayload, AlertTriagedPayload, AlertsIngestedPayload, ConsoleEvent,
    DeferredReleasedPayload, DraftTransitionPayload, MetricsUpdatedPayload, PlanTransitionPayload,
    ScanCompletedPayload,
};
pub use feed::{FeedConfig, IngestTicket, QueueFeedController, RevealOutcome};
pub use metrics::{baseline_from, SessionMetrics};
pub use runtime::{spawn_reveal_driver, spawn_tick_loop, tick_cadence};
pub use scheduler::{ScanConfig, ScanEffects, ScanScheduler, TickOutcome};
pub use session::{AdvisorSession, SessionConfig};
pub use store::{
    JsonFileStateStore, MemoryStateStore, StateStore, KEY_METRICS_COUNTERS, KEY_METRICS_SNAPSHOT,
    KEY_SCAN_BOOTSTRAPPED, KEY_SCAN_NEXT_RUN_AT,
};
