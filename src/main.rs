use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use narrator_backend::controllers::narration::NarrationController;
use narrator_backend::domain::narration::{Mp3ConcatArchiver, NarrationService};
use narrator_backend::infrastructure::config::{Config, LogFormat};
use narrator_backend::infrastructure::http::start_http_server;
use narrator_backend::infrastructure::repositories::{
    OpenAiTtsRepository, PollyTtsRepository, TtsRepository,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        "Starting Narrator Backend on {}:{}",
        config.host,
        config.port
    );

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Instantiate provider repositories
    let mut repositories: Vec<Arc<dyn TtsRepository>> = Vec::new();

    if config.polly_enabled {
        tracing::info!("Initializing AWS Polly client with region: {}", config.aws_region);

        let has_access_key = std::env::var("AWS_ACCESS_KEY_ID").is_ok();
        let has_secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").is_ok();
        if !has_access_key || !has_secret_key {
            tracing::warn!("AWS credentials not found in environment variables. Will attempt to use other credential providers (instance metadata, etc.)");
        }

        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.aws_region.clone()))
            .load()
            .await;
        tracing::info!(region = ?aws_config.region(), "AWS configuration loaded");

        let polly_client = Arc::new(aws_sdk_polly::Client::new(&aws_config));
        repositories.push(Arc::new(PollyTtsRepository::new(polly_client)));
    } else {
        tracing::info!("AWS Polly disabled by configuration");
    }

    match &config.openai_api_key {
        Some(api_key) => {
            tracing::info!(model = %config.openai_tts_model, "Initializing OpenAI TTS client");
            let openai_config = async_openai::config::OpenAIConfig::new().with_api_key(api_key);
            let openai_client = Arc::new(async_openai::Client::with_config(openai_config));
            repositories.push(Arc::new(OpenAiTtsRepository::new(
                openai_client,
                config.openai_tts_model.clone(),
                config.openai_tts_voice.clone(),
            )));
        }
        None => tracing::info!("OPENAI_API_KEY not set, OpenAI provider disabled"),
    }

    if repositories.is_empty() {
        tracing::warn!("No TTS provider configured; every run request will be rejected");
    }

    // 2. Instantiate services
    let narration_service = Arc::new(NarrationService::new(
        repositories,
        Arc::new(Mp3ConcatArchiver),
        config.max_text_length,
        config.run_ttl(),
    ));

    // 3. Instantiate controllers
    let narration_controller = Arc::new(NarrationController::new(narration_service));

    // Start HTTP server with all routes
    start_http_server(Arc::new(config), narration_controller).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "narrator_backend=debug,tower_http=debug".into());

    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
