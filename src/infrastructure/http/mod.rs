pub mod request_id;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::controllers::{health, narration::NarrationController};
use crate::infrastructure::config::Config;

pub use request_id::{request_id_middleware, RequestId, X_REQUEST_ID};

/// Build the application router with all routes configured
pub fn create_router(narration_controller: Arc<NarrationController>) -> Router {
    // Provider catalogue and chunk preview
    let catalogue_routes = Router::new()
        .route("/api/providers", get(NarrationController::list_providers))
        .route("/api/chunks/preview", post(NarrationController::preview_chunks))
        .with_state(narration_controller.clone());

    // Narration runs
    let run_routes = Router::new()
        .route("/api/runs", post(NarrationController::create_run))
        .route("/api/runs/:runId", get(NarrationController::get_run))
        .route("/api/runs/:runId/start", post(NarrationController::start_run))
        .route("/api/runs/:runId/pause", post(NarrationController::pause_run))
        .route("/api/runs/:runId/resume", post(NarrationController::resume_run))
        .route("/api/runs/:runId/abort", post(NarrationController::abort_run))
        .route("/api/runs/:runId/retry", post(NarrationController::retry_run))
        .route(
            "/api/runs/:runId/chunks/:chunkIndex/audio",
            get(NarrationController::chunk_audio),
        )
        .route("/api/runs/:runId/export", get(NarrationController::export))
        .route(
            "/api/runs/:runId/export/manifest",
            get(NarrationController::export_manifest),
        )
        .with_state(narration_controller);

    Router::new()
        .route("/health", get(health::health))
        .merge(catalogue_routes)
        .merge(run_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Start the HTTP server with all routes configured
pub async fn start_http_server(
    config: Arc<Config>,
    narration_controller: Arc<NarrationController>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(narration_controller);

    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
