//! Error types for the ingest module

use std::path::PathBuf;
use thiserror::Error;

use crate::models::SourceId;

/// Result type for ingest operations
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors raised while loading coupon sources
#[derive(Error, Debug)]
pub enum IngestError {
    /// Source could not be opened; startup must abort
    #[error("Failed to open coupon source {source_id} at {}: {error}", path.display())]
    SourceOpen {
        source_id: SourceId,
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Load aborted by a shutdown request
    #[error("Load of coupon source {source_id} cancelled")]
    Cancelled { source_id: SourceId },

    /// A worker or the reader task panicked or was aborted
    #[error("Ingest task for source {source_id} failed: {reason}")]
    WorkerFailed { source_id: SourceId, reason: String },
}

impl IngestError {
    /// Source the error relates to
    pub fn source_id(&self) -> SourceId {
        match self {
            Self::SourceOpen { source_id, .. }
            | Self::Cancelled { source_id }
            | Self::WorkerFailed { source_id, .. } => *source_id,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
