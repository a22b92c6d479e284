use futures::future::join_all;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use uuid::Uuid;

use super::chunker::TextChunk;
use super::job::{ChunkArtifact, ChunkStateStore};
use super::progress::{estimate_duration_seconds, RunState};
use super::provider::ProviderProfile;
use crate::domain::tts::VoiceParameters;
use crate::infrastructure::repositories::TtsRepository;

/// Cooperative signal read by the scheduler at its checkpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunControl {
    Proceed,
    Pause,
    Abort,
}

type ChunkResult = (usize, Result<ChunkArtifact, String>);

/// Drives a run's chunks through the provider in rate-limited batches.
///
/// Batches run strictly one after another with the profile's delay between
/// them; chunks inside a batch are generated concurrently and the batch only
/// settles once every generation has finished, successfully or not. Pause and
/// abort are honoured before a batch and during the delay, never mid-batch.
pub struct BatchScheduler {
    repository: Arc<dyn TtsRepository>,
    profile: ProviderProfile,
    voice: VoiceParameters,
}

impl BatchScheduler {
    pub fn new(
        repository: Arc<dyn TtsRepository>,
        profile: ProviderProfile,
        voice: VoiceParameters,
    ) -> Self {
        Self {
            repository,
            profile,
            voice,
        }
    }

    pub fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    pub fn voice(&self) -> &VoiceParameters {
        &self.voice
    }

    /// Run batches from the first unattempted one until the run is exhausted
    /// or a checkpoint sees a pause/abort request.
    ///
    /// Expects the store to be `Running`; returns the state it left it in.
    pub async fn drive(
        &self,
        run_id: Uuid,
        store: &RwLock<ChunkStateStore>,
        mut control: watch::Receiver<RunControl>,
    ) -> RunState {
        let delay = self.profile.inter_batch_delay();

        loop {
            let batch_index = {
                let mut guard = store.write();
                let stop = match *control.borrow_and_update() {
                    RunControl::Pause => Some(RunState::Paused),
                    RunControl::Abort => Some(RunState::Aborted),
                    RunControl::Proceed if guard.progress().is_exhausted() => {
                        Some(RunState::Completed)
                    }
                    RunControl::Proceed => None,
                };

                if let Some(state) = stop {
                    return Self::stop(run_id, &mut guard, state);
                }

                let batch_index = guard.progress().completed_batches;
                guard.mark_current_batch(batch_index);
                batch_index
            };

            if batch_index > 0 && !delay.is_zero() {
                let interrupted = Self::wait_between_batches(delay, &mut control).await;
                // Go back through the checkpoint; a pause that was lifted
                // again during the wait restarts the full delay
                if interrupted || *control.borrow() != RunControl::Proceed {
                    continue;
                }
            }

            let (chunks, total_batches) = {
                let mut guard = store.write();
                match guard.begin_batch(batch_index) {
                    Ok(chunks) => (chunks, guard.progress().total_batches),
                    Err(e) => {
                        tracing::error!(
                            run_id = %run_id,
                            batch = batch_index + 1,
                            error = %e,
                            "Could not start batch, skipping it"
                        );
                        guard.abandon_batch(&format!("batch {} failed: {}", batch_index + 1, e));
                        continue;
                    }
                }
            };

            tracing::info!(
                run_id = %run_id,
                provider = self.profile.name,
                batch = batch_index + 1,
                total_batches = total_batches,
                chunk_count = chunks.len(),
                "Sending batch"
            );

            let started = Instant::now();
            let results = self.generate_batch(run_id, batch_index, chunks).await;

            let mut guard = store.write();
            match guard.settle_batch(results) {
                Ok(outcome) => {
                    let progress = guard.progress();
                    tracing::info!(
                        run_id = %run_id,
                        batch = batch_index + 1,
                        total_batches = progress.total_batches,
                        batch_completed = outcome.completed,
                        batch_failed = outcome.failed,
                        completed_chunks = progress.completed_chunks,
                        failed_chunks = progress.failed_chunks,
                        latency_ms = started.elapsed().as_millis(),
                        "Batch settled"
                    );
                }
                Err(e) => {
                    let outcome =
                        guard.abandon_batch(&format!("batch {} failed: {}", batch_index + 1, e));
                    tracing::error!(
                        run_id = %run_id,
                        batch = batch_index + 1,
                        error = %e,
                        batch_failed = outcome.failed,
                        "Could not record batch results, failing its chunks"
                    );
                }
            }
        }
    }

    /// Sleep out the inter-batch delay; true if a pause or abort cut it short
    async fn wait_between_batches(
        delay: Duration,
        control: &mut watch::Receiver<RunControl>,
    ) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        let signalled = tokio::select! {
            _ = &mut sleep => return false,
            signal = control.wait_for(|c| *c != RunControl::Proceed) => signal.is_ok(),
        };

        if !signalled {
            // Sender gone, nobody can pause any more
            sleep.await;
        }
        signalled
    }

    /// Fan the batch out and wait for every generation to settle.
    ///
    /// Each chunk gets its own task so a panicking provider call only fails
    /// that chunk. If the fan-out task itself dies, every chunk of the batch
    /// is failed with that error.
    async fn generate_batch(
        &self,
        run_id: Uuid,
        batch_index: usize,
        chunks: Vec<TextChunk>,
    ) -> Vec<ChunkResult> {
        let indices: Vec<usize> = chunks.iter().map(|chunk| chunk.index).collect();
        let repository = Arc::clone(&self.repository);
        let voice = self.voice.clone();

        let fan_out = tokio::spawn(async move {
            let (indices, handles): (Vec<usize>, Vec<_>) = chunks
                .into_iter()
                .map(|chunk| {
                    let repository = Arc::clone(&repository);
                    let voice = voice.clone();
                    let index = chunk.index;
                    let handle = tokio::spawn(async move {
                        generate_chunk(repository.as_ref(), &chunk, &voice).await
                    });
                    (index, handle)
                })
                .unzip();

            indices
                .into_iter()
                .zip(join_all(handles).await)
                .map(|(index, joined)| {
                    let result = joined
                        .unwrap_or_else(|e| Err(format!("generation task failed: {}", e)));
                    (index, result)
                })
                .collect::<Vec<_>>()
        });

        match fan_out.await {
            Ok(results) => results,
            Err(e) => {
                tracing::error!(
                    run_id = %run_id,
                    batch = batch_index + 1,
                    error = %e,
                    "Batch fan-out failed, failing every chunk in it"
                );
                let message = format!("batch {} failed: {}", batch_index + 1, e);
                indices
                    .into_iter()
                    .map(|index| (index, Err(message.clone())))
                    .collect()
            }
        }
    }

    fn stop(run_id: Uuid, store: &mut ChunkStateStore, state: RunState) -> RunState {
        if let Err(e) = store.set_state(state) {
            tracing::warn!(run_id = %run_id, error = %e, "Run state not changed");
            return store.state();
        }

        let progress = store.progress();
        let summary = progress.summary();
        tracing::info!(
            run_id = %run_id,
            state = ?state,
            completed_batches = progress.completed_batches,
            total_batches = progress.total_batches,
            total_chunks = summary.total_chunks,
            completed_chunks = summary.completed_chunks,
            failed_chunks = summary.failed_chunks,
            success_rate = format!("{:.1}", summary.success_rate),
            "Narration run stopped"
        );

        state
    }
}

async fn generate_chunk(
    repository: &dyn TtsRepository,
    chunk: &TextChunk,
    voice: &VoiceParameters,
) -> Result<ChunkArtifact, String> {
    let started = Instant::now();

    let audio = repository
        .generate(&chunk.text, voice)
        .await
        .and_then(|audio| {
            if audio.is_empty() {
                Err(format!("{} returned empty audio", repository.provider()))
            } else {
                Ok(audio)
            }
        })
        .map_err(|e| {
            tracing::warn!(
                chunk_index = chunk.index,
                provider = %repository.provider(),
                error = %e,
                "Chunk generation failed"
            );
            e
        })?;

    tracing::debug!(
        chunk_index = chunk.index,
        audio_size = audio.len(),
        latency_ms = started.elapsed().as_millis(),
        "Chunk generated"
    );

    Ok(ChunkArtifact {
        audio: Arc::from(audio),
        duration_estimate_seconds: estimate_duration_seconds(&chunk.text),
        filename: format!("chunk_{}.mp3", chunk.index + 1),
    })
}
