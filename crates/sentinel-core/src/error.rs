use thiserror::Error;

use crate::approval::TransitionError;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Transport or availability failure from the external advisor service.
    /// State is left unchanged; the caller may retry.
    #[error("advisor service error: {0}")]
    Service(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    /// A response arrived for an alert or workflow that is no longer
    /// selected. Callers drop these silently.
    #[error("response arrived for a stale selection")]
    StaleSelection,
    #[error("no alert is selected")]
    NoSelection,
    #[error("another request is already in flight")]
    Busy,
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl CoreError {
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service(message.into())
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }
}
