use thiserror::Error;

/// Failures of the remote schedule store, as seen by the editor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("no schedule stored under '{schedule_id}'")]
    NotFound { schedule_id: String },
    #[error("malformed schedule payload: {0}")]
    Malformed(String),
    #[error("remote rejected the schedule: {0}")]
    Rejected(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

impl SyncError {
    /// Whether a failed fetch should be answered by materializing the
    /// first-run schedule locally rather than reported.
    pub fn falls_back_to_default(&self) -> bool {
        matches!(self, SyncError::NotFound { .. } | SyncError::Malformed(_))
    }
}
