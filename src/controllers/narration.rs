use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::narration::{
        ChunkPreview, ChunkPreviewRequest, CreateRunRequest, ExportManifest, NarrationService,
        NarrationServiceApi, ProviderInfo, RunSnapshot,
    },
    error::{AppError, AppResult},
};

const AUDIO_MPEG: &str = "audio/mpeg";

pub struct NarrationController {
    narration_service: Arc<NarrationService>,
}

impl NarrationController {
    pub fn new(narration_service: Arc<NarrationService>) -> Self {
        Self { narration_service }
    }

    /// GET /api/providers - Provider profiles and availability
    pub async fn list_providers(
        State(controller): State<Arc<NarrationController>>,
    ) -> Json<Vec<ProviderInfo>> {
        Json(controller.narration_service.providers())
    }

    /// POST /api/chunks/preview - Chunk text without generating audio
    pub async fn preview_chunks(
        State(controller): State<Arc<NarrationController>>,
        Json(request): Json<ChunkPreviewRequest>,
    ) -> AppResult<Json<ChunkPreview>> {
        let preview = controller.narration_service.preview_chunks(request).await?;
        Ok(Json(preview))
    }

    /// POST /api/runs - Create a narration run
    pub async fn create_run(
        State(controller): State<Arc<NarrationController>>,
        Json(request): Json<CreateRunRequest>,
    ) -> AppResult<(StatusCode, Json<RunSnapshot>)> {
        let snapshot = controller.narration_service.create_run(request).await?;
        Ok((StatusCode::CREATED, Json(snapshot)))
    }

    /// GET /api/runs/{runId} - Run progress, jobs and summary
    pub async fn get_run(
        State(controller): State<Arc<NarrationController>>,
        Path(run_id): Path<Uuid>,
    ) -> AppResult<Json<RunSnapshot>> {
        Ok(Json(controller.narration_service.get_run(run_id).await?))
    }

    /// POST /api/runs/{runId}/start
    pub async fn start_run(
        State(controller): State<Arc<NarrationController>>,
        Path(run_id): Path<Uuid>,
    ) -> AppResult<Json<RunSnapshot>> {
        Ok(Json(controller.narration_service.start_run(run_id).await?))
    }

    /// POST /api/runs/{runId}/pause
    pub async fn pause_run(
        State(controller): State<Arc<NarrationController>>,
        Path(run_id): Path<Uuid>,
    ) -> AppResult<Json<RunSnapshot>> {
        Ok(Json(controller.narration_service.pause_run(run_id).await?))
    }

    /// POST /api/runs/{runId}/resume
    pub async fn resume_run(
        State(controller): State<Arc<NarrationController>>,
        Path(run_id): Path<Uuid>,
    ) -> AppResult<Json<RunSnapshot>> {
        Ok(Json(controller.narration_service.resume_run(run_id).await?))
    }

    /// POST /api/runs/{runId}/abort
    pub async fn abort_run(
        State(controller): State<Arc<NarrationController>>,
        Path(run_id): Path<Uuid>,
    ) -> AppResult<Json<RunSnapshot>> {
        Ok(Json(controller.narration_service.abort_run(run_id).await?))
    }

    /// POST /api/runs/{runId}/retry - New run for the failed chunks
    pub async fn retry_run(
        State(controller): State<Arc<NarrationController>>,
        Path(run_id): Path<Uuid>,
    ) -> AppResult<(StatusCode, Json<RunSnapshot>)> {
        let snapshot = controller.narration_service.retry_failed(run_id).await?;
        Ok((StatusCode::CREATED, Json(snapshot)))
    }

    /// GET /api/runs/{runId}/chunks/{chunkIndex}/audio - One chunk's MP3
    pub async fn chunk_audio(
        State(controller): State<Arc<NarrationController>>,
        Path((run_id, chunk_index)): Path<(Uuid, usize)>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        let artifact = controller
            .narration_service
            .chunk_audio(run_id, chunk_index)
            .await?;

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(AUDIO_MPEG));
        headers.insert(
            header::CONTENT_DISPOSITION,
            header_value(&format!("inline; filename=\"{}\"", artifact.filename))?,
        );
        headers.insert(
            "X-Duration-Seconds",
            header_value(&format!("{:.1}", artifact.duration_estimate_seconds))?,
        );

        Ok((StatusCode::OK, headers, Body::from(artifact.audio.to_vec())))
    }

    /// GET /api/runs/{runId}/export - Completed chunks merged in narration order
    pub async fn export(
        State(controller): State<Arc<NarrationController>>,
        Path(run_id): Path<Uuid>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        let bundle = controller.narration_service.export(run_id).await?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(bundle.content_type),
        );
        headers.insert(
            header::CONTENT_DISPOSITION,
            header_value(&format!("attachment; filename=\"narration_{}.mp3\"", run_id))?,
        );
        headers.insert("X-Chunk-Count", HeaderValue::from(bundle.entries.len()));
        headers.insert("X-Archive-Entries", header_value(&bundle.entries.join(","))?);

        Ok((StatusCode::OK, headers, Body::from(bundle.bytes)))
    }

    /// GET /api/runs/{runId}/export/manifest - Ordered entry names only
    pub async fn export_manifest(
        State(controller): State<Arc<NarrationController>>,
        Path(run_id): Path<Uuid>,
    ) -> AppResult<Json<ExportManifest>> {
        Ok(Json(
            controller.narration_service.export_manifest(run_id).await?,
        ))
    }
}

fn header_value(value: &str) -> AppResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::Internal(format!("invalid header value: {}", e)))
}
