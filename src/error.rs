use std::time::Duration;

use thiserror::Error;

use crate::waveform::RefreshRequest;

/// Errors surfaced by the ink pipeline.
///
/// Per-sample conditions such as contact overflow are absorbed and logged
/// by the tracker; only init-time and sink-facing failures reach callers.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The dispatcher queue stayed full for the whole bounded wait.
    /// `unsent` holds every request that was decided but not queued.
    #[error("display sink busy after {waited:?} ({} refresh request(s) not queued)", .unsent.len())]
    SinkBusy {
        waited: Duration,
        unsent: Vec<RefreshRequest>,
    },

    #[error("refresh dispatcher is closed")]
    Closed,

    #[error("display sink failed: {0}")]
    Sink(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }
}
