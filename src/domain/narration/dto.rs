use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chunker::TextChunk;
use super::job::{ChunkJob, ChunkStatus};
use super::progress::{BatchProgress, RunState, RunSummary};
use super::provider::{Provider, ProviderProfile};
use crate::domain::tts::VoiceParameters;

/// Request for POST /api/runs
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRunRequest {
    pub text: String,
    pub provider: String,
    /// ISO 639-1 code or "auto"; detected when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    /// Start generating right away (default true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<bool>,
}

/// Request for POST /api/chunks/preview
#[derive(Debug, Serialize, Deserialize)]
pub struct ChunkPreviewRequest {
    pub text: String,
    pub provider: String,
}

#[derive(Debug, Serialize)]
pub struct ChunkPreview {
    pub provider: Provider,
    pub max_chunk_length: usize,
    pub total_batches: usize,
    pub chunks: Vec<TextChunk>,
}

#[derive(Debug, Serialize)]
pub struct ProviderInfo {
    pub provider: Provider,
    pub configured: bool,
    pub profile: ProviderProfile,
}

/// Read-only view of one chunk and its job
#[derive(Debug, Clone, Serialize)]
pub struct ChunkJobView {
    pub chunk_index: usize,
    pub status: ChunkStatus,
    pub text: String,
    pub start_char: usize,
    pub end_char: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_estimate_seconds: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_size_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChunkJobView {
    pub fn new(chunk: &TextChunk, job: &ChunkJob) -> Self {
        let artifact = job.artifact();
        Self {
            chunk_index: job.chunk_index(),
            status: job.status(),
            text: chunk.text.clone(),
            start_char: chunk.start_char,
            end_char: chunk.end_char,
            filename: artifact.map(|a| a.filename.clone()),
            duration_estimate_seconds: artifact.map(|a| a.duration_estimate_seconds),
            audio_size_bytes: artifact.map(|a| a.audio.len()),
            error: job.error().map(str::to_string),
        }
    }
}

/// Progress observation surface: counters plus the authoritative job list
#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub id: Uuid,
    pub provider: Provider,
    pub profile: ProviderProfile,
    pub voice: VoiceParameters,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_of: Option<Uuid>,
    pub state: RunState,
    pub progress: BatchProgress,
    pub summary: RunSummary,
    pub chunks: Vec<ChunkJobView>,
}

/// Merged audio plus the ordered archive entry names it was built from
#[derive(Debug, Clone)]
pub struct ExportBundle {
    pub content_type: &'static str,
    pub entries: Vec<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Serialize)]
pub struct ExportManifest {
    pub run_id: Uuid,
    pub entries: Vec<String>,
}
