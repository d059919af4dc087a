use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::identifiers::{AlertId, ClientId, DraftId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftStatus {
    PendingApproval,
    ApprovedReady,
    Rejected,
}

impl DraftStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::ApprovedReady | Self::Rejected)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpDraft {
    pub draft_id: DraftId,
    pub alert_id: AlertId,
    pub client_id: ClientId,
    pub status: DraftStatus,
    pub recipient_email: String,
    pub subject: String,
    pub body: String,
    pub generation_provider: String,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub approved_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
