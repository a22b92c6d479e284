use std::sync::Arc;

use super::dto::ExportBundle;
use super::error::ExportError;
use super::job::{ChunkJob, ChunkStatus};

const MIN_SEQUENCE_WIDTH: usize = 3;

/// One named file in an export, in narration order
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub chunk_index: usize,
    pub audio: Arc<[u8]>,
}

/// Packs ordered entries into a single downloadable payload
pub trait Archiver: Send + Sync {
    fn content_type(&self) -> &'static str;

    fn archive(&self, entries: &[ArchiveEntry]) -> Vec<u8>;
}

/// Joins MP3 payloads back to back. MP3 is a frame stream, so the
/// concatenation plays as one continuous file.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mp3ConcatArchiver;

impl Archiver for Mp3ConcatArchiver {
    fn content_type(&self) -> &'static str {
        "audio/mpeg"
    }

    fn archive(&self, entries: &[ArchiveEntry]) -> Vec<u8> {
        let total: usize = entries.iter().map(|entry| entry.audio.len()).sum();
        let mut merged = Vec::with_capacity(total);
        for entry in entries {
            merged.extend_from_slice(&entry.audio);
        }
        merged
    }
}

/// Turns completed jobs into ordered, lexicographically sortable entries.
///
/// Only `Completed` jobs are taken; anything else is skipped silently.
/// Entry names are `{seq}_{filename}` with `seq = chunk index + 1`,
/// zero-padded so name order equals narration order.
pub fn archive_entries<'a, I>(jobs: I) -> Result<Vec<ArchiveEntry>, ExportError>
where
    I: IntoIterator<Item = &'a ChunkJob>,
{
    let mut completed: Vec<&ChunkJob> = jobs
        .into_iter()
        .filter(|job| job.status() == ChunkStatus::Completed)
        .collect();

    if completed.is_empty() {
        return Err(ExportError::NoCompletedChunks);
    }

    completed.sort_by_key(|job| job.chunk_index());

    let largest = completed
        .last()
        .map(|job| job.chunk_index() + 1)
        .unwrap_or(1);
    let width = largest.to_string().len().max(MIN_SEQUENCE_WIDTH);

    Ok(completed
        .into_iter()
        .filter_map(|job| {
            let artifact = job.artifact()?;
            Some(ArchiveEntry {
                name: format!(
                    "{:0width$}_{}",
                    job.chunk_index() + 1,
                    artifact.filename,
                    width = width
                ),
                chunk_index: job.chunk_index(),
                audio: Arc::clone(&artifact.audio),
            })
        })
        .collect())
}

/// Export completed jobs through an archiver
pub fn assemble<'a, I>(jobs: I, archiver: &dyn Archiver) -> Result<ExportBundle, ExportError>
where
    I: IntoIterator<Item = &'a ChunkJob>,
{
    let entries = archive_entries(jobs)?;
    let bytes = archiver.archive(&entries);

    tracing::info!(
        entry_count = entries.len(),
        archive_size_bytes = bytes.len(),
        content_type = archiver.content_type(),
        "Export assembled"
    );

    Ok(ExportBundle {
        content_type: archiver.content_type(),
        entries: entries.into_iter().map(|entry| entry.name).collect(),
        bytes,
    })
}
