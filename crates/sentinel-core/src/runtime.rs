//! Tokio drivers for the pull-driven parts of the session.
//!
//! The session itself never sleeps or spawns; these loops own the clocks.
//! A reveal driver belongs to one ingest ticket and exits on its own the
//! moment a newer ingest supersedes it, so overlapping drivers are harmless.

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::feed::{IngestTicket, RevealOutcome};
use crate::session::AdvisorSession;

/// Drives one staggered reveal to completion. The lock is released between
/// steps so triage and scheduler work interleave with the reveal.
pub fn spawn_reveal_driver(
    session: Arc<Mutex<AdvisorSession>>,
    ticket: IngestTicket,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let outcome = {
                let mut session = session.lock().await;
                session.reveal_step(ticket.epoch, OffsetDateTime::now_utc())
            };
            match outcome {
                RevealOutcome::Revealed { .. } => {}
                RevealOutcome::Waiting { next_at } => {
                    let delta = next_at - OffsetDateTime::now_utc();
                    let pause = std::time::Duration::try_from(delta).unwrap_or_default();
                    tokio::time::sleep(pause).await;
                }
                RevealOutcome::Complete => {
                    debug!(epoch = ticket.epoch, "reveal complete");
                    break;
                }
                RevealOutcome::Superseded => {
                    debug!(epoch = ticket.epoch, "reveal superseded by a later ingest");
                    break;
                }
            }
        }
    })
}

/// Tick cadence for [`spawn_tick_loop`], taken from configuration.
pub fn tick_cadence(config: &sentinel_config::ScanConfigToml) -> std::time::Duration {
    std::time::Duration::from_millis(config.tick_cadence_ms)
}

/// Runs the cooperative scheduler check on a fixed cadence until aborted.
/// Tick failures are logged and the loop keeps going.
pub fn spawn_tick_loop(
    session: Arc<Mutex<AdvisorSession>>,
    cadence: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cadence);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let mut session = session.lock().await;
            if let Err(error) = session.autonomous_tick(OffsetDateTime::now_utc()).await {
                warn!(%error, "scheduler tick failed");
            }
        }
    })
}
