//! Scan scheduler: owns the single monotonically-advancing due time for the
//! autonomous scan cycle and fires its side effects when due.
//!
//! The due time persists across reloads; a session-scoped bootstrap flag
//! resets the very first delay once per browsing session so a fresh session
//! never fires a stale persisted time immediately on open. A persisted due
//! time already in the past fires on the next tick; there is no artificial
//! catch-up delay beyond the tick cadence.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};
use tracing::warn;

use sentinel_domain::RunSummary;

use crate::approval::BusyGuard;
use crate::error::CoreError;
use crate::store::{StateStore, KEY_SCAN_BOOTSTRAPPED, KEY_SCAN_NEXT_RUN_AT};

pub const DEFAULT_FIRST_DELAY_SECS: i64 = 8;
pub const DEFAULT_INTERVAL_SECS: i64 = 45;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    pub first_delay: Duration,
    pub interval: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            first_delay: Duration::seconds(DEFAULT_FIRST_DELAY_SECS),
            interval: Duration::seconds(DEFAULT_INTERVAL_SECS),
        }
    }
}

impl From<&sentinel_config::ScanConfigToml> for ScanConfig {
    fn from(config: &sentinel_config::ScanConfigToml) -> Self {
        Self {
            first_delay: Duration::seconds(config.first_delay_secs as i64),
            interval: Duration::seconds(config.interval_secs as i64),
        }
    }
}

/// Side effects of one autonomous cycle, kept behind a seam so the
/// scheduler stays decoupled from the feed and service wiring.
#[async_trait]
pub trait ScanEffects: Send {
    async fn release_deferred(&mut self) -> Result<(), CoreError>;
    async fn refresh_health(&mut self) -> Result<(), CoreError>;
    async fn run_full_scan(&mut self) -> Result<RunSummary, CoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    NotDue { due: OffsetDateTime },
    InFlight,
    Fired { next_due: OffsetDateTime },
}

#[derive(Debug, Default)]
pub struct ScanScheduler {
    config: ScanConfig,
    in_flight: AtomicBool,
}

impl ScanScheduler {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Returns the current due time, arming it first when needed. The first
    /// call in a browsing session always re-arms with the first delay,
    /// ignoring whatever a previous session persisted.
    pub fn get_or_init_due_time(
        &self,
        now: OffsetDateTime,
        persistent: &mut dyn StateStore,
        session: &mut dyn StateStore,
    ) -> Result<OffsetDateTime, CoreError> {
        let bootstrapped = session.load(KEY_SCAN_BOOTSTRAPPED)?.is_some();
        if !bootstrapped {
            let due = now + self.config.first_delay;
            self.persist_due(due, persistent)?;
            session.save(KEY_SCAN_BOOTSTRAPPED, "true")?;
            return Ok(due);
        }

        match persistent.load(KEY_SCAN_NEXT_RUN_AT)? {
            Some(raw) => match OffsetDateTime::parse(&raw, &Rfc3339) {
                Ok(due) => Ok(due),
                Err(error) => {
                    warn!(%raw, %error, "discarding unparseable persisted due time");
                    let due = now + self.config.first_delay;
                    self.persist_due(due, persistent)?;
                    Ok(due)
                }
            },
            None => {
                let due = now + self.config.first_delay;
                self.persist_due(due, persistent)?;
                Ok(due)
            }
        }
    }

    /// Re-arms the due time relative to `now` and persists it. Called after
    /// every run, manual or autonomous.
    pub fn advance(
        &self,
        now: OffsetDateTime,
        persistent: &mut dyn StateStore,
    ) -> Result<OffsetDateTime, CoreError> {
        let due = now + self.config.interval;
        self.persist_due(due, persistent)?;
        Ok(due)
    }

    /// Cooperative check invoked on the tick cadence. Fires at most one
    /// autonomous cycle: release one deferred alert, refresh lightweight
    /// status, then advance. Effect failures are swallowed so one failed
    /// cycle never blocks the next; the in-flight flag clears on every exit,
    /// including a future dropped mid-cycle.
    pub async fn tick(
        &self,
        now: OffsetDateTime,
        persistent: &mut dyn StateStore,
        session: &mut dyn StateStore,
        effects: &mut dyn ScanEffects,
    ) -> Result<TickOutcome, CoreError> {
        if self.is_in_flight() {
            return Ok(TickOutcome::InFlight);
        }
        let due = self.get_or_init_due_time(now, persistent, session)?;
        if now < due {
            return Ok(TickOutcome::NotDue { due });
        }

        let _running = BusyGuard::arm(&self.in_flight);
        if let Err(error) = effects.release_deferred().await {
            warn!(%error, "autonomous cycle failed to release a deferred alert");
        }
        if let Err(error) = effects.refresh_health().await {
            warn!(%error, "autonomous cycle failed to refresh health");
        }
        let next_due = self.advance(now, persistent)?;

        Ok(TickOutcome::Fired { next_due })
    }

    /// Manual run: bypasses the due time, forces a full scan, and advances
    /// the schedule unconditionally afterward so it never stalls even when
    /// the scan fails.
    pub async fn run_manual(
        &self,
        now: OffsetDateTime,
        persistent: &mut dyn StateStore,
        effects: &mut dyn ScanEffects,
    ) -> Result<RunSummary, CoreError> {
        if self.is_in_flight() {
            return Err(CoreError::Busy);
        }

        let _running = BusyGuard::arm(&self.in_flight);
        let result = effects.run_full_scan().await;
        let advanced = self.advance(now, persistent);

        let summary = result?;
        advanced?;
        Ok(summary)
    }

    fn persist_due(
        &self,
        due: OffsetDateTime,
        persistent: &mut dyn StateStore,
    ) -> Result<(), CoreError> {
        let rendered = due
            .format(&Rfc3339)
            .map_err(|error| CoreError::persistence(format!("failed to format due time: {error}")))?;
        persistent.save(KEY_SCAN_NEXT_RUN_AT, &rendered)
    }
}
