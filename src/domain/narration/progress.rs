//! Run-level state and the aggregate counters derived from chunk jobs.

use serde::{Deserialize, Serialize};

use super::error::RunLifecycleError;

const CHARACTERS_PER_MINUTE: f32 = 1000.0;

/// Lifecycle of a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Paused,
    Completed,
    Aborted,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Aborted)
    }

    /// Check a transition; resume never goes back to `Idle`
    pub fn transition(self, to: RunState) -> Result<RunState, RunLifecycleError> {
        let allowed = matches!(
            (self, to),
            (RunState::Idle, RunState::Running)
                | (RunState::Idle, RunState::Aborted)
                | (RunState::Running, RunState::Paused)
                | (RunState::Running, RunState::Completed)
                | (RunState::Running, RunState::Aborted)
                | (RunState::Paused, RunState::Running)
                | (RunState::Paused, RunState::Aborted)
        );

        if allowed {
            Ok(to)
        } else {
            Err(RunLifecycleError::InvalidTransition { from: self, to })
        }
    }
}

/// Aggregate progress of a run.
///
/// A cache over the job list: counters only move when a settled batch is
/// folded in, so `completed_chunks + failed_chunks` never runs ahead of the
/// jobs that actually reached a terminal status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub state: RunState,
    pub total_chunks: usize,
    pub total_batches: usize,
    /// 1-based; 0 until the first batch is picked up
    pub current_batch: usize,
    pub completed_batches: usize,
    pub completed_chunks: usize,
    pub failed_chunks: usize,
}

impl BatchProgress {
    pub fn new(total_chunks: usize, total_batches: usize) -> Self {
        Self {
            state: RunState::Idle,
            total_chunks,
            total_batches,
            current_batch: 0,
            completed_batches: 0,
            completed_chunks: 0,
            failed_chunks: 0,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.completed_batches >= self.total_batches
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::new(self.total_chunks, self.completed_chunks, self.failed_chunks)
    }
}

/// Final tally reported when a run stops
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_chunks: usize,
    pub completed_chunks: usize,
    pub failed_chunks: usize,
    pub pending_chunks: usize,
    /// Percentage of chunks completed; an empty run is vacuously 100%
    pub success_rate: f64,
}

impl RunSummary {
    pub fn new(total_chunks: usize, completed_chunks: usize, failed_chunks: usize) -> Self {
        let success_rate = if total_chunks == 0 {
            100.0
        } else {
            completed_chunks as f64 / total_chunks as f64 * 100.0
        };

        Self {
            total_chunks,
            completed_chunks,
            failed_chunks,
            pending_chunks: total_chunks.saturating_sub(completed_chunks + failed_chunks),
            success_rate,
        }
    }
}

/// Rough spoken length of a text, for display only
pub fn estimate_duration_seconds(text: &str) -> f32 {
    text.chars().count() as f32 / CHARACTERS_PER_MINUTE * 60.0
}
