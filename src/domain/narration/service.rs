use async_trait::async_trait;
use moka::future::Cache;
use moka::notification::RemovalCause;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::chunker::chunk_text;
use super::dto::{
    ChunkPreview, ChunkPreviewRequest, CreateRunRequest, ExportBundle, ExportManifest,
    ProviderInfo, RunSnapshot,
};
use super::error::{NarrationServiceError, RunConfigError};
use super::export::{archive_entries, assemble, Archiver};
use super::job::{ChunkArtifact, ChunkStatus};
use super::progress::RunState;
use super::provider::Provider;
use super::run::NarrationRun;
use super::scheduler::BatchScheduler;
use crate::domain::tts::{clean_text, LanguageCode, LanguageGuesser, VoiceParameters};
use crate::infrastructure::repositories::TtsRepository;

const MAX_LIVE_RUNS: u64 = 1000;

pub struct NarrationService {
    repositories: HashMap<Provider, Arc<dyn TtsRepository>>,
    runs: Cache<Uuid, Arc<NarrationRun>>,
    archiver: Arc<dyn Archiver>,
    language_guesser: LanguageGuesser,
    max_text_length: usize,
}

impl NarrationService {
    pub fn new(
        repositories: Vec<Arc<dyn TtsRepository>>,
        archiver: Arc<dyn Archiver>,
        max_text_length: usize,
        run_ttl: Duration,
    ) -> Self {
        let repositories = repositories
            .into_iter()
            .map(|repository| (repository.provider(), repository))
            .collect();

        // Runs live in memory only; idle ones are dropped after the TTL and
        // the cache starts evicting once MAX_LIVE_RUNS is reached. A run
        // evicted before it stopped is aborted so its driver does not keep
        // generating audio nobody can fetch any more.
        let runs = Cache::builder()
            .max_capacity(MAX_LIVE_RUNS)
            .time_to_idle(run_ttl)
            .eviction_listener(|run_id: Arc<Uuid>, run: Arc<NarrationRun>, cause: RemovalCause| {
                if !matches!(cause, RemovalCause::Expired | RemovalCause::Size)
                    || run.state().is_terminal()
                {
                    return;
                }
                match run.abort() {
                    Ok(()) => tracing::warn!(
                        run_id = %run_id,
                        cause = ?cause,
                        "Unfinished run evicted from the registry, aborting it"
                    ),
                    Err(e) => tracing::debug!(run_id = %run_id, error = %e, "Evicted run not aborted"),
                }
            })
            .build();

        Self {
            repositories,
            runs,
            archiver,
            language_guesser: LanguageGuesser::new(),
            max_text_length,
        }
    }
}

#[async_trait]
pub trait NarrationServiceApi: Send + Sync {
    /// Provider profiles and whether each one is usable in this process
    fn providers(&self) -> Vec<ProviderInfo>;

    /// Chunk text the way a run would, without generating anything
    async fn preview_chunks(
        &self,
        request: ChunkPreviewRequest,
    ) -> Result<ChunkPreview, NarrationServiceError>;

    /// Validate, clean and chunk the text, then register a new run.
    ///
    /// Configuration errors are raised before any job exists. The run starts
    /// generating immediately unless `start` is false.
    async fn create_run(
        &self,
        request: CreateRunRequest,
    ) -> Result<RunSnapshot, NarrationServiceError>;

    async fn get_run(&self, run_id: Uuid) -> Result<RunSnapshot, NarrationServiceError>;

    async fn start_run(&self, run_id: Uuid) -> Result<RunSnapshot, NarrationServiceError>;

    async fn pause_run(&self, run_id: Uuid) -> Result<RunSnapshot, NarrationServiceError>;

    async fn resume_run(&self, run_id: Uuid) -> Result<RunSnapshot, NarrationServiceError>;

    async fn abort_run(&self, run_id: Uuid) -> Result<RunSnapshot, NarrationServiceError>;

    /// Start a fresh run for the failed chunks of a stopped run
    async fn retry_failed(&self, run_id: Uuid) -> Result<RunSnapshot, NarrationServiceError>;

    async fn chunk_audio(
        &self,
        run_id: Uuid,
        chunk_index: usize,
    ) -> Result<ChunkArtifact, NarrationServiceError>;

    async fn export(&self, run_id: Uuid) -> Result<ExportBundle, NarrationServiceError>;

    async fn export_manifest(&self, run_id: Uuid) -> Result<ExportManifest, NarrationServiceError>;
}

#[async_trait]
impl NarrationServiceApi for NarrationService {
    fn providers(&self) -> Vec<ProviderInfo> {
        Provider::ALL
            .iter()
            .map(|provider| ProviderInfo {
                provider: *provider,
                configured: self.repositories.contains_key(provider),
                profile: provider.profile(),
            })
            .collect()
    }

    async fn preview_chunks(
        &self,
        request: ChunkPreviewRequest,
    ) -> Result<ChunkPreview, NarrationServiceError> {
        let provider = self.validate(&request.text, &request.provider)?;
        let cleaned = Self::prepare_text(&request.text)?;
        let profile = provider.profile();
        let chunks = chunk_text(&cleaned, profile.max_chunk_length);

        Ok(ChunkPreview {
            provider,
            max_chunk_length: profile.max_chunk_length,
            total_batches: profile.batch_count(chunks.len()),
            chunks,
        })
    }

    async fn create_run(
        &self,
        request: CreateRunRequest,
    ) -> Result<RunSnapshot, NarrationServiceError> {
        tracing::info!(
            provider = %request.provider,
            text_length = request.text.len(),
            "Narration run request"
        );

        let provider = self.validate(&request.text, &request.provider)?;
        let repository = self.repository(provider)?;
        let requested_voice = request.voice.filter(|v| !v.trim().is_empty());
        if let Some(voice) = &requested_voice {
            if !repository.supports_voice(voice) {
                return Err(RunConfigError::UnsupportedVoice {
                    provider: provider.to_string(),
                    voice: voice.clone(),
                }
                .into());
            }
        }
        let cleaned = Self::prepare_text(&request.text)?;
        let language = self.resolve_language(request.language.as_deref(), &cleaned)?;

        let profile = provider.profile();
        let chunks = chunk_text(&cleaned, profile.max_chunk_length);

        tracing::info!(
            provider = %provider,
            language = %language,
            original_length = request.text.len(),
            cleaned_length = cleaned.len(),
            chunk_count = chunks.len(),
            total_batches = profile.batch_count(chunks.len()),
            "Text chunked for narration"
        );

        let voice = VoiceParameters {
            voice: requested_voice,
            language,
            speed: request.speed,
        };
        let scheduler = Arc::new(BatchScheduler::new(repository, profile, voice));
        let run = NarrationRun::new(provider, chunks, scheduler, None);
        self.runs.insert(run.id(), Arc::clone(&run)).await;

        if request.start.unwrap_or(true) {
            run.start()?;
        }

        Ok(run.snapshot())
    }

    async fn get_run(&self, run_id: Uuid) -> Result<RunSnapshot, NarrationServiceError> {
        Ok(self.find_run(run_id).await?.snapshot())
    }

    async fn start_run(&self, run_id: Uuid) -> Result<RunSnapshot, NarrationServiceError> {
        let run = self.find_run(run_id).await?;
        run.start()?;
        Ok(run.snapshot())
    }

    async fn pause_run(&self, run_id: Uuid) -> Result<RunSnapshot, NarrationServiceError> {
        let run = self.find_run(run_id).await?;
        run.pause()?;
        Ok(run.snapshot())
    }

    async fn resume_run(&self, run_id: Uuid) -> Result<RunSnapshot, NarrationServiceError> {
        let run = self.find_run(run_id).await?;
        run.resume()?;
        Ok(run.snapshot())
    }

    async fn abort_run(&self, run_id: Uuid) -> Result<RunSnapshot, NarrationServiceError> {
        let run = self.find_run(run_id).await?;
        run.abort()?;
        Ok(run.snapshot())
    }

    async fn retry_failed(&self, run_id: Uuid) -> Result<RunSnapshot, NarrationServiceError> {
        let source = self.find_run(run_id).await?;

        let state = source.state();
        if !(state.is_terminal() || state == RunState::Paused) {
            return Err(NarrationServiceError::Conflict(format!(
                "run is {:?}; pause or let it finish before retrying",
                state
            )));
        }

        let failed = source.failed_chunks();
        if failed.is_empty() {
            return Err(NarrationServiceError::Conflict(
                "run has no failed chunks".to_string(),
            ));
        }

        tracing::info!(
            source_run_id = %run_id,
            chunk_count = failed.len(),
            "Retrying failed chunks in a new run"
        );

        let retry = NarrationRun::new(source.provider(), failed, source.scheduler(), Some(run_id));
        self.runs.insert(retry.id(), Arc::clone(&retry)).await;
        retry.start()?;

        Ok(retry.snapshot())
    }

    async fn chunk_audio(
        &self,
        run_id: Uuid,
        chunk_index: usize,
    ) -> Result<ChunkArtifact, NarrationServiceError> {
        let run = self.find_run(run_id).await?;
        let job = run
            .job(chunk_index)
            .ok_or_else(|| NarrationServiceError::NotFound(format!("chunk {}", chunk_index)))?;

        match job.artifact() {
            Some(artifact) if job.status() == ChunkStatus::Completed => Ok(artifact.clone()),
            _ => Err(NarrationServiceError::Conflict(format!(
                "chunk {} is {:?}",
                chunk_index,
                job.status()
            ))),
        }
    }

    async fn export(&self, run_id: Uuid) -> Result<ExportBundle, NarrationServiceError> {
        let run = self.find_run(run_id).await?;
        let jobs = run.completed_jobs();
        Ok(assemble(&jobs, self.archiver.as_ref())?)
    }

    async fn export_manifest(&self, run_id: Uuid) -> Result<ExportManifest, NarrationServiceError> {
        let run = self.find_run(run_id).await?;
        let jobs = run.completed_jobs();
        let entries = archive_entries(&jobs)?;

        Ok(ExportManifest {
            run_id,
            entries: entries.into_iter().map(|entry| entry.name).collect(),
        })
    }
}

impl NarrationService {
    async fn find_run(&self, run_id: Uuid) -> Result<Arc<NarrationRun>, NarrationServiceError> {
        self.runs
            .get(&run_id)
            .await
            .ok_or_else(|| NarrationServiceError::NotFound(format!("run {}", run_id)))
    }

    fn validate(&self, text: &str, provider: &str) -> Result<Provider, RunConfigError> {
        if provider.trim().is_empty() {
            return Err(RunConfigError::UnknownProvider(String::new()));
        }
        let provider: Provider = provider.parse()?;

        if text.trim().is_empty() {
            return Err(RunConfigError::EmptyText);
        }

        let length = text.chars().count();
        if length > self.max_text_length {
            return Err(RunConfigError::TextTooLong {
                length,
                max: self.max_text_length,
            });
        }

        Ok(provider)
    }

    fn repository(&self, provider: Provider) -> Result<Arc<dyn TtsRepository>, RunConfigError> {
        self.repositories
            .get(&provider)
            .cloned()
            .ok_or_else(|| RunConfigError::ProviderUnavailable(provider.to_string()))
    }

    fn prepare_text(text: &str) -> Result<String, RunConfigError> {
        let cleaned = clean_text(text);
        if cleaned.is_empty() {
            return Err(RunConfigError::EmptyText);
        }
        Ok(cleaned)
    }

    fn resolve_language(
        &self,
        requested: Option<&str>,
        text: &str,
    ) -> Result<LanguageCode, RunConfigError> {
        match requested.map(str::trim) {
            None | Some("") | Some("auto") => Ok(self.language_guesser.detect(text)),
            Some(code) => LanguageCode::from_code(code)
                .ok_or_else(|| RunConfigError::UnsupportedLanguage(code.to_string())),
        }
    }
}
