use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use super::chunker::TextChunk;
use super::dto::{ChunkJobView, RunSnapshot};
use super::error::RunLifecycleError;
use super::job::{ChunkJob, ChunkStateStore};
use super::progress::RunState;
use super::provider::Provider;
use super::scheduler::{BatchScheduler, RunControl};

/// One end-to-end narration run with its own isolated chunk state.
///
/// Lifecycle requests take the store's write lock before touching the
/// control channel, and the scheduler reads the channel under the same lock
/// at its checkpoints, so a resume can never race a pause that is landing.
pub struct NarrationRun {
    id: Uuid,
    provider: Provider,
    created_at: DateTime<Utc>,
    retry_of: Option<Uuid>,
    store: Arc<RwLock<ChunkStateStore>>,
    control: watch::Sender<RunControl>,
    scheduler: Arc<BatchScheduler>,
}

impl NarrationRun {
    pub fn new(
        provider: Provider,
        chunks: Vec<TextChunk>,
        scheduler: Arc<BatchScheduler>,
        retry_of: Option<Uuid>,
    ) -> Arc<Self> {
        let store = ChunkStateStore::new(chunks, scheduler.profile().batch_size);
        let (control, _) = watch::channel(RunControl::Proceed);

        Arc::new(Self {
            id: Uuid::new_v4(),
            provider,
            created_at: Utc::now(),
            retry_of,
            store: Arc::new(RwLock::new(store)),
            control,
            scheduler,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn scheduler(&self) -> Arc<BatchScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn state(&self) -> RunState {
        self.store.read().state()
    }

    /// Idle -> Running, spawning the batch loop
    pub fn start(self: &Arc<Self>) -> Result<(), RunLifecycleError> {
        {
            let mut store = self.store.write();
            if store.state() != RunState::Idle {
                return Err(RunLifecycleError::InvalidTransition {
                    from: store.state(),
                    to: RunState::Running,
                });
            }
            store.set_state(RunState::Running)?;
            self.control.send_replace(RunControl::Proceed);
        }
        tracing::info!(run_id = %self.id, provider = %self.provider, "Narration run started");
        self.spawn_driver();
        Ok(())
    }

    /// Ask the run to stop at its next checkpoint. Idempotent while paused.
    pub fn pause(&self) -> Result<(), RunLifecycleError> {
        let store = self.store.write();
        match store.state() {
            RunState::Running => {
                if *self.control.borrow() == RunControl::Abort {
                    return Err(RunLifecycleError::AbortPending);
                }
                self.control.send_replace(RunControl::Pause);
                tracing::info!(run_id = %self.id, "Pause requested");
                Ok(())
            }
            RunState::Paused => Ok(()),
            from => Err(RunLifecycleError::InvalidTransition {
                from,
                to: RunState::Paused,
            }),
        }
    }

    /// Continue from the next unattempted batch.
    ///
    /// On a run that is still running (pause requested but not yet reached)
    /// this just withdraws the pause request.
    pub fn resume(self: &Arc<Self>) -> Result<(), RunLifecycleError> {
        {
            let mut store = self.store.write();
            match store.state() {
                RunState::Running => {
                    if *self.control.borrow() == RunControl::Abort {
                        return Err(RunLifecycleError::AbortPending);
                    }
                    self.control.send_replace(RunControl::Proceed);
                    return Ok(());
                }
                RunState::Paused => {
                    store.set_state(RunState::Running)?;
                    self.control.send_replace(RunControl::Proceed);
                }
                from => {
                    return Err(RunLifecycleError::InvalidTransition {
                        from,
                        to: RunState::Running,
                    })
                }
            }
        }
        tracing::info!(run_id = %self.id, "Narration run resumed");
        self.spawn_driver();
        Ok(())
    }

    /// Stop for good. A running run stops at its next checkpoint; an idle or
    /// paused one is aborted on the spot.
    pub fn abort(&self) -> Result<(), RunLifecycleError> {
        let mut store = self.store.write();
        match store.state() {
            RunState::Running => {
                self.control.send_replace(RunControl::Abort);
                tracing::info!(run_id = %self.id, "Abort requested");
                Ok(())
            }
            _ => {
                store.set_state(RunState::Aborted)?;
                self.control.send_replace(RunControl::Abort);
                tracing::info!(run_id = %self.id, "Narration run aborted");
                Ok(())
            }
        }
    }

    pub fn snapshot(&self) -> RunSnapshot {
        let store = self.store.read();
        let progress = store.progress().clone();

        RunSnapshot {
            id: self.id,
            provider: self.provider,
            profile: *self.scheduler.profile(),
            voice: self.scheduler.voice().clone(),
            created_at: self.created_at,
            retry_of: self.retry_of,
            state: progress.state,
            summary: progress.summary(),
            progress,
            chunks: store
                .chunks()
                .iter()
                .zip(store.jobs())
                .map(|(chunk, job)| ChunkJobView::new(chunk, job))
                .collect(),
        }
    }

    /// Chunks that ended failed, for a manual retry run
    pub fn failed_chunks(&self) -> Vec<TextChunk> {
        self.store.read().failed_chunks()
    }

    pub fn completed_jobs(&self) -> Vec<ChunkJob> {
        self.store.read().completed_jobs()
    }

    pub fn job(&self, chunk_index: usize) -> Option<ChunkJob> {
        self.store.read().job(chunk_index).cloned()
    }

    fn spawn_driver(self: &Arc<Self>) {
        let run = Arc::clone(self);
        tokio::spawn(async move {
            let control = run.control.subscribe();
            run.scheduler.drive(run.id, &run.store, control).await;
        });
    }
}
