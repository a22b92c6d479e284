//! Long-text narration: chunking, batched generation, run control and export.

pub mod chunker;
pub mod dto;
pub mod error;
pub mod export;
pub mod job;
pub mod progress;
pub mod provider;
pub mod run;
pub mod scheduler;
pub mod service;

pub use chunker::{chunk_text, TextChunk};
pub use dto::{
    ChunkJobView, ChunkPreview, ChunkPreviewRequest, CreateRunRequest, ExportBundle,
    ExportManifest, ProviderInfo, RunSnapshot,
};
pub use error::{
    ChunkStateError, ExportError, NarrationServiceError, RunConfigError, RunLifecycleError,
};
pub use export::{Archiver, Mp3ConcatArchiver};
pub use job::{ChunkArtifact, ChunkJob, ChunkStatus, ChunkStateStore};
pub use progress::{BatchProgress, RunState, RunSummary};
pub use provider::{Provider, ProviderProfile};
pub use run::NarrationRun;
pub use scheduler::{BatchScheduler, RunControl};
pub use service::{NarrationService, NarrationServiceApi};
