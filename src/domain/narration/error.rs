use super::job::ChunkStatus;
use super::progress::RunState;
use crate::error::AppError;

/// Rejections raised before any chunk work starts
#[derive(Debug, thiserror::Error)]
pub enum RunConfigError {
    #[error("text cannot be empty")]
    EmptyText,
    #[error("text must be {max} characters or less, got {length}")]
    TextTooLong { length: usize, max: usize },
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("provider {0} is not configured")]
    ProviderUnavailable(String),
    #[error("{provider} has no voice named {voice}")]
    UnsupportedVoice { provider: String, voice: String },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChunkStateError {
    #[error("no job for chunk {0}")]
    UnknownChunk(usize),
    #[error("chunk {chunk_index} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        chunk_index: usize,
        from: ChunkStatus,
        to: ChunkStatus,
    },
    #[error("batch {0} is out of range")]
    UnknownBatch(usize),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RunLifecycleError {
    #[error("run cannot go from {from:?} to {to:?}")]
    InvalidTransition { from: RunState, to: RunState },
    #[error("run is being aborted")]
    AbortPending,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExportError {
    #[error("no completed chunks to export")]
    NoCompletedChunks,
}

#[derive(Debug, thiserror::Error)]
pub enum NarrationServiceError {
    #[error(transparent)]
    Config(#[from] RunConfigError),
    #[error(transparent)]
    Lifecycle(#[from] RunLifecycleError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<NarrationServiceError> for AppError {
    fn from(err: NarrationServiceError) -> Self {
        match err {
            NarrationServiceError::Config(RunConfigError::TextTooLong { .. }) => {
                AppError::PayloadTooLarge(err.to_string())
            }
            NarrationServiceError::Config(RunConfigError::ProviderUnavailable(_)) => {
                AppError::ServiceUnavailable(err.to_string())
            }
            NarrationServiceError::Config(e) => AppError::BadRequest(e.to_string()),
            NarrationServiceError::Lifecycle(e) => AppError::Conflict(e.to_string()),
            NarrationServiceError::Export(e) => AppError::UnprocessableEntity(e.to_string()),
            NarrationServiceError::NotFound(what) => AppError::NotFound(what),
            NarrationServiceError::Conflict(msg) => AppError::Conflict(msg),
        }
    }
}
