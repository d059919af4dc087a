//! Session metrics aggregator.
//!
//! Owns the raw counters and the latest run summary, persists them through
//! the continuity store, and recomputes the derived snapshot on demand via
//! [`sentinel_domain::derive_performance`]. Persistence is best-effort: a
//! store failure is logged and never blocks the triage action that caused
//! the counter bump.

use tracing::warn;

use sentinel_config::MetricsConfigToml;
use sentinel_domain::{
    derive_performance, DraftEvent, PerformanceBaseline, PerformanceSnapshot, RunSummary,
    SessionCounters, TriageAction,
};

use crate::store::{StateStore, KEY_METRICS_COUNTERS, KEY_METRICS_SNAPSHOT};

pub fn baseline_from(config: &MetricsConfigToml) -> PerformanceBaseline {
    PerformanceBaseline {
        accuracy_floor: config.accuracy_floor,
        accuracy_ceiling: config.accuracy_ceiling,
        false_positive_floor: config.false_positive_floor,
        false_positive_ceiling: config.false_positive_ceiling,
        latency_floor_secs: config.latency_floor_secs,
        feedback_baseline: config.feedback_baseline,
        ..PerformanceBaseline::default()
    }
}

#[derive(Debug)]
pub struct SessionMetrics {
    baseline: PerformanceBaseline,
    counters: SessionCounters,
    latest_run: Option<RunSummary>,
    last_snapshot: Option<PerformanceSnapshot>,
}

impl SessionMetrics {
    pub fn new(baseline: PerformanceBaseline) -> Self {
        Self {
            baseline,
            counters: SessionCounters::default(),
            latest_run: None,
            last_snapshot: None,
        }
    }

    /// Rebuilds the aggregator from persisted counters and the last derived
    /// snapshot. Corrupt or missing entries fall back to zeroed counters;
    /// the run summary is session-scoped and always starts empty.
    pub fn restore(baseline: PerformanceBaseline, store: &dyn StateStore) -> Self {
        let mut metrics = Self::new(baseline);
        metrics.counters = load_json(store, KEY_METRICS_COUNTERS).unwrap_or_default();
        metrics.last_snapshot = load_json(store, KEY_METRICS_SNAPSHOT);
        metrics
    }

    pub fn counters(&self) -> &SessionCounters {
        &self.counters
    }

    pub fn latest_run(&self) -> Option<&RunSummary> {
        self.latest_run.as_ref()
    }

    pub fn last_snapshot(&self) -> Option<&PerformanceSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn record_triage(&mut self, action: TriageAction, store: &mut dyn StateStore) {
        self.counters.record_triage(action);
        persist_json(store, KEY_METRICS_COUNTERS, &self.counters);
    }

    pub fn record_draft(&mut self, event: DraftEvent, store: &mut dyn StateStore) {
        self.counters.record_draft(event);
        persist_json(store, KEY_METRICS_COUNTERS, &self.counters);
    }

    /// The newest run summary replaces the previous one wholesale.
    pub fn record_run(&mut self, run: RunSummary) {
        self.latest_run = Some(run);
    }

    /// Recomputes the snapshot from scratch and persists it for the next
    /// session reload.
    pub fn refresh(&mut self, queue_size: usize, store: &mut dyn StateStore) -> PerformanceSnapshot {
        let snapshot = derive_performance(
            &self.counters,
            self.latest_run.as_ref(),
            queue_size,
            &self.baseline,
        );
        self.last_snapshot = Some(snapshot);
        persist_json(store, KEY_METRICS_SNAPSHOT, &snapshot);
        snapshot
    }
}

fn load_json<T: serde::de::DeserializeOwned>(store: &dyn StateStore, key: &str) -> Option<T> {
    let raw = match store.load(key) {
        Ok(raw) => raw?,
        Err(error) => {
            warn!(key, %error, "failed to load persisted metrics entry");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(key, %error, "discarding corrupt persisted metrics entry");
            None
        }
    }
}

fn persist_json<T: serde::Serialize>(store: &mut dyn StateStore, key: &str, value: &T) {
    let rendered = match serde_json::to_string(value) {
        Ok(rendered) => rendered,
        Err(error) => {
            warn!(key, %error, "failed to render metrics entry");
            return;
        }
    };
    if let Err(error) = store.save(key, &rendered) {
        warn!(key, %error, "failed to persist metrics entry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStateStore;
    use sentinel_domain::RunId;

    fn run_with_created(created: u32) -> RunSummary {
        let mut run = RunSummary::empty(RunId::new("run-metrics"), "mock");
        run.created_alerts_count = created;
        run
    }

    #[test]
    fn counters_survive_a_simulated_reload() {
        let mut store = MemoryStateStore::new();
        let baseline = PerformanceBaseline::default();

        let mut metrics = SessionMetrics::new(baseline);
        metrics.record_triage(TriageAction::Reviewed, &mut store);
        metrics.record_triage(TriageAction::Escalate, &mut store);
        metrics.record_draft(DraftEvent::Created, &mut store);
        let snapshot = metrics.refresh(12, &mut store);

        let restored = SessionMetrics::restore(baseline, &store);
        assert_eq!(restored.counters().reviewed, 1);
        assert_eq!(restored.counters().escalated, 1);
        assert_eq!(restored.counters().drafts_created, 1);
        assert_eq!(restored.counters().actions, 2);
        assert_eq!(restored.last_snapshot(), Some(&snapshot));
        // Run summaries are session-scoped and do not persist.
        assert_eq!(restored.latest_run(), None);
    }

    #[test]
    fn corrupt_persisted_counters_fall_back_to_zero() {
        let mut store = MemoryStateStore::new();
        store
            .save(KEY_METRICS_COUNTERS, "not json at all")
            .expect("seed corrupt entry");

        let metrics = SessionMetrics::restore(PerformanceBaseline::default(), &store);
        assert_eq!(metrics.counters(), &SessionCounters::default());
    }

    #[test]
    fn refresh_recomputes_from_counters_and_latest_run() {
        let mut store = MemoryStateStore::new();
        let baseline = PerformanceBaseline::default();
        let mut metrics = SessionMetrics::new(baseline);

        let before = metrics.refresh(0, &mut store);
        assert_eq!(before.detection_accuracy, baseline.accuracy_base);

        metrics.record_triage(TriageAction::Reviewed, &mut store);
        metrics.record_run(run_with_created(10));
        let after = metrics.refresh(0, &mut store);
        assert!(after.detection_accuracy > before.detection_accuracy);
        assert!(after.false_positive_rate < before.false_positive_rate);
        assert!(after.avg_detection_latency_secs < before.avg_detection_latency_secs);
    }

    #[test]
    fn config_overrides_flow_into_the_baseline() {
        let toml = MetricsConfigToml {
            accuracy_floor: 80.0,
            feedback_baseline: 10,
            ..MetricsConfigToml::default()
        };
        let baseline = baseline_from(&toml);
        assert_eq!(baseline.accuracy_floor, 80.0);
        assert_eq!(baseline.feedback_baseline, 10);
        // Non-configurable tuning keeps the built-in values.
        assert_eq!(baseline.accuracy_base, PerformanceBaseline::default().accuracy_base);
    }
}
