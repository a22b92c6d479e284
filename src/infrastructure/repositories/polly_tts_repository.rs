use super::tts_repository::TtsRepository;
use crate::domain::narration::Provider;
use crate::domain::tts::{LanguageCode, VoiceParameters};
use async_trait::async_trait;
use aws_sdk_polly::{
    types::{Engine, OutputFormat, TextType, VoiceId},
    Client as PollyClient,
};
use std::sync::Arc;

/// Polly's prosody rate bounds, in percent of normal speed
const MIN_RATE_PERCENT: f32 = 20.0;
const MAX_RATE_PERCENT: f32 = 200.0;

/// AWS Polly implementation of TTS repository
pub struct PollyTtsRepository {
    polly_client: Arc<PollyClient>,
}

impl PollyTtsRepository {
    pub fn new(polly_client: Arc<PollyClient>) -> Self {
        Self { polly_client }
    }

    /// Select the appropriate Polly voice for a language
    fn get_voice_for_language(language: LanguageCode) -> &'static str {
        match language {
            LanguageCode::English => "Joanna",
            LanguageCode::Spanish => "Lupe",
            LanguageCode::French => "Lea",
            LanguageCode::German => "Vicki",
            LanguageCode::Italian => "Bianca",
            LanguageCode::Portuguese => "Ines",
        }
    }

    fn resolve_voice(voice: &VoiceParameters) -> String {
        voice
            .voice
            .clone()
            .unwrap_or_else(|| Self::get_voice_for_language(voice.language).to_string())
    }

    /// Build the request body. Plain text unless a speed is requested, in
    /// which case the text is wrapped in an SSML prosody tag.
    fn request_text(text: &str, speed: Option<f32>) -> (String, TextType) {
        match speed {
            Some(speed) if (speed - 1.0).abs() > f32::EPSILON => {
                let rate = (speed * 100.0).clamp(MIN_RATE_PERCENT, MAX_RATE_PERCENT);
                (
                    format!(
                        "<speak><prosody rate=\"{:.0}%\">{}</prosody></speak>",
                        rate,
                        escape_ssml(text)
                    ),
                    TextType::Ssml,
                )
            }
            _ => (text.to_string(), TextType::Text),
        }
    }
}

fn escape_ssml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[async_trait]
impl TtsRepository for PollyTtsRepository {
    fn provider(&self) -> Provider {
        Provider::Polly
    }

    async fn generate(&self, text: &str, voice: &VoiceParameters) -> Result<Vec<u8>, String> {
        let start_time = std::time::Instant::now();

        // Always use the neural engine
        let voice_name = Self::resolve_voice(voice);
        let voice_id = VoiceId::from(voice_name.as_str());
        let engine = Engine::Neural;
        let (body, text_type) = Self::request_text(text, voice.speed);

        tracing::info!(
            language = %voice.language,
            voice = %voice_name,
            engine = ?engine,
            text_type = ?text_type,
            output_format = "Mp3",
            text_length = text.len(),
            text_preview = %text.chars().take(200).collect::<String>(),
            "Calling AWS Polly synthesize_speech"
        );

        let result = self
            .polly_client
            .synthesize_speech()
            .text(body)
            .text_type(text_type)
            .voice_id(voice_id.clone())
            .output_format(OutputFormat::Mp3)
            .engine(engine.clone())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = ?e,
                    error_display = %e,
                    language = %voice.language,
                    voice_id = ?voice_id,
                    engine = ?engine,
                    text_length = text.len(),
                    "AWS Polly synthesize_speech failed"
                );
                format!("AWS Polly error: {}", e)
            })?;

        tracing::debug!("AWS Polly synthesize_speech successful, reading audio stream");

        let audio_stream = result.audio_stream.collect().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to collect audio stream from Polly response");
            format!("Failed to read audio stream: {}", e)
        })?;

        let audio_data = audio_stream.into_bytes().to_vec();

        let duration = start_time.elapsed();
        let characters_count = text.len();
        let throughput_chars_per_sec = if duration.as_secs_f64() > 0.0 {
            characters_count as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        tracing::info!(
            provider = "polly",
            latency_ms = duration.as_millis(),
            characters_count = characters_count,
            audio_size_bytes = audio_data.len(),
            throughput_chars_per_sec = format!("{:.2}", throughput_chars_per_sec),
            "TTS chunk generated"
        );

        Ok(audio_data)
    }
}
