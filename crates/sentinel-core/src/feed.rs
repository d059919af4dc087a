//! Queue feed controller: owns the visible alert queue, its staggered
//! reveal, and the deferred overflow buffer.
//!
//! Reveal is pull-driven: `ingest` stages the ranked queue and stamps an
//! epoch; a driver loops `reveal_step` on the stagger cadence. A later
//! ingest bumps the epoch, so steps from a superseded ingest are no-ops.
//! Cancellation is the epoch check, not timer bookkeeping.

use std::collections::VecDeque;

use time::{Duration, OffsetDateTime};

use sentinel_domain::{dedupe_alerts, rank_alerts, ranked, AlertId, AlertSummary, Priority};

pub const DEFAULT_VISIBLE_WINDOW: usize = 50;
pub const DEFAULT_DEFERRED_WINDOW: usize = 5;
pub const DEFAULT_STAGGER_MS: i64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedConfig {
    pub visible_window: usize,
    pub deferred_window: usize,
    pub stagger: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            visible_window: DEFAULT_VISIBLE_WINDOW,
            deferred_window: DEFAULT_DEFERRED_WINDOW,
            stagger: Duration::milliseconds(DEFAULT_STAGGER_MS),
        }
    }
}

impl From<&sentinel_config::FeedConfigToml> for FeedConfig {
    fn from(config: &sentinel_config::FeedConfigToml) -> Self {
        Self {
            visible_window: config.visible_window,
            deferred_window: config.deferred_window,
            stagger: Duration::milliseconds(config.stagger_ms as i64),
        }
    }
}

/// Handle for one ingest call; reveal steps quote it so stale drivers can
/// be told they were superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestTicket {
    pub epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    /// A later ingest superseded this epoch; the caller should stop.
    Superseded,
    /// Not due yet; poll again at or after `next_at`.
    Waiting { next_at: OffsetDateTime },
    Revealed { alert_id: AlertId, remaining: usize },
    Complete,
}

#[derive(Debug)]
pub struct QueueFeedController {
    config: FeedConfig,
    epoch: u64,
    visible: Vec<AlertSummary>,
    pending: VecDeque<AlertSummary>,
    next_reveal_at: Option<OffsetDateTime>,
    deferred: VecDeque<AlertSummary>,
}

impl QueueFeedController {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            config,
            epoch: 0,
            visible: Vec::new(),
            pending: VecDeque::new(),
            next_reveal_at: None,
            deferred: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn visible(&self) -> &[AlertSummary] {
        &self.visible
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Alerts staged for reveal but not yet visible.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_revealing(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Replaces the queue with a freshly ordered and deduplicated view of
    /// `alerts`, staged for incremental reveal starting at `now`. Supersedes
    /// any reveal still in progress.
    pub fn ingest(&mut self, alerts: Vec<AlertSummary>, now: OffsetDateTime) -> IngestTicket {
        let mut pool = ranked(dedupe_alerts(alerts));
        pool.truncate(self.config.visible_window);

        self.epoch += 1;
        self.visible.clear();
        self.pending = pool.into();
        self.next_reveal_at = if self.pending.is_empty() {
            None
        } else {
            Some(now)
        };
        IngestTicket { epoch: self.epoch }
    }

    /// Reveals at most one staged alert. Drivers loop this until they see
    /// `Waiting`, `Complete`, or `Superseded`.
    pub fn reveal_step(&mut self, epoch: u64, now: OffsetDateTime) -> RevealOutcome {
        if epoch != self.epoch {
            return RevealOutcome::Superseded;
        }
        let Some(due) = self.next_reveal_at else {
            return RevealOutcome::Complete;
        };
        if now < due {
            return RevealOutcome::Waiting { next_at: due };
        }
        let Some(alert) = self.pending.pop_front() else {
            self.next_reveal_at = None;
            return RevealOutcome::Complete;
        };

        // Pending is already in rank order, so appending keeps the visible
        // queue sorted.
        let alert_id = alert.id;
        self.visible.push(alert);
        self.next_reveal_at = if self.pending.is_empty() {
            None
        } else {
            Some(due + self.config.stagger)
        };
        RevealOutcome::Revealed {
            alert_id,
            remaining: self.pending.len(),
        }
    }

    /// Holds back the ranked slice of `pool` beyond the visible window as a
    /// private overflow buffer, bounded by the deferred window.
    pub fn seed_deferred(&mut self, pool: Vec<AlertSummary>) {
        let ordered = ranked(dedupe_alerts(pool));
        self.deferred = ordered
            .into_iter()
            .skip(self.config.visible_window)
            .take(self.config.deferred_window)
            .collect();
    }

    /// Pops one deferred alert and re-introduces it as a drift event arriving
    /// now: fresh timestamp, HIGH priority, front of the queue.
    pub fn release_next_deferred(&mut self, now: OffsetDateTime) -> Option<AlertSummary> {
        let mut alert = self.deferred.pop_front()?;
        alert.created_at = now;
        alert.priority = Priority::High;
        alert.recently_arrived = true;

        self.visible.retain(|existing| existing.id != alert.id);
        self.visible.insert(0, alert.clone());
        rank_alerts(&mut self.visible);
        Some(alert)
    }

    /// Removes an alert after a terminal triage action. Idempotent.
    pub fn remove_by_id(&mut self, alert_id: AlertId) {
        self.visible.retain(|alert| alert.id != alert_id);
        self.pending.retain(|alert| alert.id != alert_id);
    }

    /// Clears the recently-arrived marker once the advisor has viewed the
    /// alert.
    pub fn mark_opened(&mut self, alert_id: AlertId) {
        if let Some(alert) = self.visible.iter_mut().find(|alert| alert.id == alert_id) {
            alert.recently_arrived = false;
        }
    }
}

impl Default for QueueFeedController {
    fn default() -> Self {
        Self::new(FeedConfig::default())
    }
}
