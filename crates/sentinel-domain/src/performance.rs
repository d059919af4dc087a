//! Session performance derivation.
//!
//! The snapshot is a pure function of the raw counters, the latest run
//! summary, and the current queue size. Nothing here drifts incrementally:
//! every read recomputes from scratch, so the outputs can never wander away
//! from the counters that justify them. `feedback_cases` is a display
//! estimate, not a measured quantity; the max() keeps it from regressing
//! below prior history when the queue shrinks.

use serde::{Deserialize, Serialize};

use crate::alert::TriageAction;
use crate::run::RunSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftEvent {
    Created,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionCounters {
    pub reviewed: u32,
    pub escalated: u32,
    pub false_positive: u32,
    pub actions: u32,
    pub drafts_created: u32,
    pub drafts_approved: u32,
    pub drafts_rejected: u32,
}

impl SessionCounters {
    /// Bumps exactly one status counter and the total action count.
    pub fn record_triage(&mut self, action: TriageAction) {
        match action {
            TriageAction::Reviewed => self.reviewed += 1,
            TriageAction::Escalate => self.escalated += 1,
            TriageAction::FalsePositive => self.false_positive += 1,
        }
        self.actions += 1;
    }

    /// Bumps exactly one draft counter.
    pub fn record_draft(&mut self, event: DraftEvent) {
        match event {
            DraftEvent::Created => self.drafts_created += 1,
            DraftEvent::Approved => self.drafts_approved += 1,
            DraftEvent::Rejected => self.drafts_rejected += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceBaseline {
    pub accuracy_base: f64,
    pub accuracy_review_bonus: f64,
    pub accuracy_created_bonus: f64,
    pub accuracy_false_positive_penalty: f64,
    pub accuracy_floor: f64,
    pub accuracy_ceiling: f64,
    pub false_positive_base: f64,
    pub false_positive_step_up: f64,
    pub false_positive_step_down: f64,
    pub false_positive_floor: f64,
    pub false_positive_ceiling: f64,
    pub latency_base_secs: f64,
    pub latency_decay_secs: f64,
    pub latency_floor_secs: f64,
    pub feedback_baseline: u64,
}

impl Default for PerformanceBaseline {
    fn default() -> Self {
        Self {
            accuracy_base: 96.4,
            accuracy_review_bonus: 0.05,
            accuracy_created_bonus: 0.02,
            accuracy_false_positive_penalty: 0.35,
            accuracy_floor: 90.0,
            accuracy_ceiling: 99.8,
            false_positive_base: 2.1,
            false_positive_step_up: 0.3,
            false_positive_step_down: 0.05,
            false_positive_floor: 0.3,
            false_positive_ceiling: 9.5,
            latency_base_secs: 42.0,
            latency_decay_secs: 0.25,
            latency_floor_secs: 6.0,
            feedback_baseline: 1240,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub detection_accuracy: f64,
    pub false_positive_rate: f64,
    pub avg_detection_latency_secs: f64,
    pub feedback_cases: u64,
}

pub fn derive_performance(
    counters: &SessionCounters,
    latest_run: Option<&RunSummary>,
    queue_size: usize,
    baseline: &PerformanceBaseline,
) -> PerformanceSnapshot {
    let created = latest_run.map(|run| run.created_alerts_count).unwrap_or(0);

    let detection_accuracy = (baseline.accuracy_base
        + f64::from(counters.reviewed) * baseline.accuracy_review_bonus
        + f64::from(created) * baseline.accuracy_created_bonus
        - f64::from(counters.false_positive) * baseline.accuracy_false_positive_penalty)
        .clamp(baseline.accuracy_floor, baseline.accuracy_ceiling);

    let false_positive_rate = (baseline.false_positive_base
        + f64::from(counters.false_positive) * baseline.false_positive_step_up
        - f64::from(counters.reviewed) * baseline.false_positive_step_down)
        .clamp(baseline.false_positive_floor, baseline.false_positive_ceiling);

    let avg_detection_latency_secs = (baseline.latency_base_secs
        - f64::from(counters.actions) * baseline.latency_decay_secs)
        .max(baseline.latency_floor_secs);

    let feedback_cases = baseline
        .feedback_baseline
        .max(u64::from(created) + queue_size as u64 + u64::from(counters.actions));

    PerformanceSnapshot {
        detection_accuracy,
        false_positive_rate,
        avg_detection_latency_secs,
        feedback_cases,
    }
}
