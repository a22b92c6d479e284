use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;

use super::chunker::TextChunk;
use super::error::{ChunkStateError, RunLifecycleError};
use super::progress::{BatchProgress, RunState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStatus {
    Pending,
    Generating,
    Completed,
    Failed,
}

/// Generated audio for one chunk
#[derive(Debug, Clone)]
pub struct ChunkArtifact {
    pub audio: Arc<[u8]>,
    pub duration_estimate_seconds: f32,
    pub filename: String,
}

/// Mutable generation state of one chunk.
///
/// The artifact is present only when completed and the error only when
/// failed; the transition methods are the only way to set either.
#[derive(Debug, Clone)]
pub struct ChunkJob {
    chunk_index: usize,
    status: ChunkStatus,
    artifact: Option<ChunkArtifact>,
    error: Option<String>,
}

impl ChunkJob {
    pub fn pending(chunk_index: usize) -> Self {
        Self {
            chunk_index,
            status: ChunkStatus::Pending,
            artifact: None,
            error: None,
        }
    }

    pub fn chunk_index(&self) -> usize {
        self.chunk_index
    }

    pub fn status(&self) -> ChunkStatus {
        self.status
    }

    pub fn artifact(&self) -> Option<&ChunkArtifact> {
        self.artifact.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn start(&mut self) -> Result<(), ChunkStateError> {
        self.guard(ChunkStatus::Pending, ChunkStatus::Generating)?;
        self.status = ChunkStatus::Generating;
        Ok(())
    }

    pub fn complete(&mut self, artifact: ChunkArtifact) -> Result<(), ChunkStateError> {
        self.guard(ChunkStatus::Generating, ChunkStatus::Completed)?;
        self.status = ChunkStatus::Completed;
        self.artifact = Some(artifact);
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), ChunkStateError> {
        self.guard(ChunkStatus::Generating, ChunkStatus::Failed)?;
        self.status = ChunkStatus::Failed;
        self.error = Some(error.into());
        Ok(())
    }

    fn guard(&self, from: ChunkStatus, to: ChunkStatus) -> Result<(), ChunkStateError> {
        if self.status == from {
            Ok(())
        } else {
            Err(ChunkStateError::InvalidTransition {
                chunk_index: self.chunk_index,
                from: self.status,
                to,
            })
        }
    }
}

/// Counts of one settled batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub completed: usize,
    pub failed: usize,
}

/// Chunk list, one job per chunk, and the progress cache of a single run.
///
/// The scheduler is the only writer. Chunks are kept in emission order, which
/// is also ascending `index` order, so jobs are looked up by binary search.
/// Indices need not be dense: a retry run carries the original indices of
/// the chunks it regenerates.
#[derive(Debug)]
pub struct ChunkStateStore {
    chunks: Vec<TextChunk>,
    jobs: Vec<ChunkJob>,
    batch_size: usize,
    progress: BatchProgress,
}

impl ChunkStateStore {
    pub fn new(mut chunks: Vec<TextChunk>, batch_size: usize) -> Self {
        chunks.sort_by_key(|chunk| chunk.index);
        chunks.dedup_by_key(|chunk| chunk.index);

        let batch_size = batch_size.max(1);
        let jobs = chunks.iter().map(|c| ChunkJob::pending(c.index)).collect();
        let progress = BatchProgress::new(chunks.len(), chunks.len().div_ceil(batch_size));

        Self {
            chunks,
            jobs,
            batch_size,
            progress,
        }
    }

    pub fn chunks(&self) -> &[TextChunk] {
        &self.chunks
    }

    pub fn jobs(&self) -> &[ChunkJob] {
        &self.jobs
    }

    pub fn progress(&self) -> &BatchProgress {
        &self.progress
    }

    pub fn state(&self) -> RunState {
        self.progress.state
    }

    pub fn set_state(&mut self, to: RunState) -> Result<(), RunLifecycleError> {
        self.progress.state = self.progress.state.transition(to)?;
        Ok(())
    }

    pub fn job(&self, chunk_index: usize) -> Option<&ChunkJob> {
        self.position(chunk_index).map(|position| &self.jobs[position])
    }

    /// Chunks whose jobs ended `Failed`, in chunk order
    pub fn failed_chunks(&self) -> Vec<TextChunk> {
        self.chunks
            .iter()
            .zip(&self.jobs)
            .filter(|(_, job)| job.status() == ChunkStatus::Failed)
            .map(|(chunk, _)| chunk.clone())
            .collect()
    }

    /// Completed jobs, in chunk order
    pub fn completed_jobs(&self) -> Vec<ChunkJob> {
        self.jobs
            .iter()
            .filter(|job| job.status() == ChunkStatus::Completed)
            .cloned()
            .collect()
    }

    /// Recount statuses from the job list
    pub fn count_status(&self, status: ChunkStatus) -> usize {
        self.jobs.iter().filter(|job| job.status() == status).count()
    }

    /// Mark every chunk of the batch `Generating` and hand them out for fan-out
    pub fn begin_batch(&mut self, batch_index: usize) -> Result<Vec<TextChunk>, ChunkStateError> {
        let range = self.batch_range(batch_index)?;

        for job in &self.jobs[range.clone()] {
            if job.status() != ChunkStatus::Pending {
                return Err(ChunkStateError::InvalidTransition {
                    chunk_index: job.chunk_index(),
                    from: job.status(),
                    to: ChunkStatus::Generating,
                });
            }
        }
        for job in &mut self.jobs[range.clone()] {
            job.start()?;
        }

        self.mark_current_batch(batch_index);
        Ok(self.chunks[range].to_vec())
    }

    /// Record the batch the scheduler is about to wait for or send
    pub fn mark_current_batch(&mut self, batch_index: usize) {
        self.progress.current_batch = batch_index + 1;
    }

    /// Fold the settled results of a batch into jobs and counters.
    ///
    /// Results may come in any order; they are matched by chunk index. Every
    /// result is checked before any job changes, so a rejected batch leaves
    /// the store untouched.
    pub fn settle_batch(
        &mut self,
        results: Vec<(usize, Result<ChunkArtifact, String>)>,
    ) -> Result<BatchOutcome, ChunkStateError> {
        let mut positions = Vec::with_capacity(results.len());
        for (chunk_index, result) in &results {
            let position = self
                .position(*chunk_index)
                .ok_or(ChunkStateError::UnknownChunk(*chunk_index))?;
            let job = &self.jobs[position];
            if job.status() != ChunkStatus::Generating || positions.contains(&position) {
                return Err(ChunkStateError::InvalidTransition {
                    chunk_index: *chunk_index,
                    from: job.status(),
                    to: if result.is_ok() {
                        ChunkStatus::Completed
                    } else {
                        ChunkStatus::Failed
                    },
                });
            }
            positions.push(position);
        }

        let mut outcome = BatchOutcome::default();
        for (position, (_, result)) in positions.into_iter().zip(results) {
            let job = &mut self.jobs[position];
            match result {
                Ok(artifact) => {
                    job.complete(artifact)?;
                    outcome.completed += 1;
                }
                Err(error) => {
                    job.fail(error)?;
                    outcome.failed += 1;
                }
            }
        }

        self.finish_batch(outcome);
        Ok(outcome)
    }

    /// Close a batch whose results could not be recorded.
    ///
    /// Jobs still `Generating` fail with `error`; the batch counts as done so
    /// the run moves on to the next one.
    pub fn abandon_batch(&mut self, error: &str) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for job in self
            .jobs
            .iter_mut()
            .filter(|job| job.status() == ChunkStatus::Generating)
        {
            if job.fail(error).is_ok() {
                outcome.failed += 1;
            }
        }

        self.finish_batch(outcome);
        outcome
    }

    fn finish_batch(&mut self, outcome: BatchOutcome) {
        self.progress.completed_batches += 1;
        self.progress.completed_chunks += outcome.completed;
        self.progress.failed_chunks += outcome.failed;
    }

    fn batch_range(&self, batch_index: usize) -> Result<Range<usize>, ChunkStateError> {
        let start = batch_index * self.batch_size;
        if start >= self.chunks.len() {
            return Err(ChunkStateError::UnknownBatch(batch_index));
        }
        let end = (start + self.batch_size).min(self.chunks.len());
        Ok(start..end)
    }

    fn position(&self, chunk_index: usize) -> Option<usize> {
        self.jobs
            .binary_search_by_key(&chunk_index, |job| job.chunk_index())
            .ok()
    }
}
