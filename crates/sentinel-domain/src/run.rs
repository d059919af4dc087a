use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::alert::{AlertSummary, Priority};
use crate::identifiers::RunId;

/// Result of one autonomous or manual scan across the monitored portfolios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub provider_used: String,
    pub created_alerts_count: u32,
    pub priority_counts: BTreeMap<Priority, u32>,
    pub top_alerts: Vec<AlertSummary>,
}

impl RunSummary {
    pub fn empty(run_id: RunId, provider_used: impl Into<String>) -> Self {
        Self {
            run_id,
            provider_used: provider_used.into(),
            created_alerts_count: 0,
            priority_counts: BTreeMap::new(),
            top_alerts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_run_completed_at: Option<OffsetDateTime>,
    pub provider: String,
    pub degraded: bool,
}
