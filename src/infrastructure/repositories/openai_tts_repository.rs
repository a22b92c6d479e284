use super::tts_repository::TtsRepository;
use crate::domain::narration::Provider;
use crate::domain::tts::{LanguageCode, VoiceParameters};
use async_openai::{
    config::OpenAIConfig,
    types::{CreateSpeechRequest, SpeechModel, SpeechResponseFormat, Voice},
    Client,
};
use async_trait::async_trait;
use std::sync::Arc;

/// OpenAI accepts speeds between 0.25 and 4.0
const MIN_SPEED: f32 = 0.25;
const MAX_SPEED: f32 = 4.0;

/// OpenAI TTS implementation of TTS repository
pub struct OpenAiTtsRepository {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
    default_voice: String,
}

impl OpenAiTtsRepository {
    pub fn new(client: Arc<Client<OpenAIConfig>>, model: String, default_voice: String) -> Self {
        Self {
            client,
            model,
            default_voice,
        }
    }

    /// Select the appropriate OpenAI voice for a language
    /// Based on voice characteristics that suit each language
    fn get_voice_for_language(language: LanguageCode) -> &'static str {
        match language {
            LanguageCode::English => "alloy",     // Neutral American accent
            LanguageCode::Spanish => "echo",      // Warm, clear for Spanish
            LanguageCode::French => "nova",       // Soft, suitable for French
            LanguageCode::German => "onyx",       // Clear, authoritative
            LanguageCode::Italian => "fable",     // Expressive for Italian
            LanguageCode::Portuguese => "shimmer", // Clear articulation
        }
    }

    /// Request voice first, then the configured default, then the language map
    fn resolve_voice(&self, voice: &VoiceParameters) -> String {
        match &voice.voice {
            Some(name) => name.clone(),
            None if !self.default_voice.is_empty() => self.default_voice.clone(),
            None => Self::get_voice_for_language(voice.language).to_string(),
        }
    }

    fn parse_model(model: &str) -> SpeechModel {
        match model {
            "tts-1" => SpeechModel::Tts1,
            "tts-1-hd" => SpeechModel::Tts1Hd,
            other => SpeechModel::Other(other.to_string()),
        }
    }

    fn parse_voice(voice: &str) -> Option<Voice> {
        match voice.trim().to_lowercase().as_str() {
            "alloy" => Some(Voice::Alloy),
            "echo" => Some(Voice::Echo),
            "fable" => Some(Voice::Fable),
            "onyx" => Some(Voice::Onyx),
            "nova" => Some(Voice::Nova),
            "shimmer" => Some(Voice::Shimmer),
            _ => None,
        }
    }
}

#[async_trait]
impl TtsRepository for OpenAiTtsRepository {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn supports_voice(&self, voice: &str) -> bool {
        Self::parse_voice(voice).is_some()
    }

    async fn generate(&self, text: &str, voice: &VoiceParameters) -> Result<Vec<u8>, String> {
        let start_time = std::time::Instant::now();
        let voice_name = self.resolve_voice(voice);

        tracing::info!(
            language = %voice.language,
            voice = %voice_name,
            model = %self.model,
            text_length = text.len(),
            text_preview = %text.chars().take(200).collect::<String>(),
            "Calling OpenAI TTS API"
        );

        let openai_voice = Self::parse_voice(&voice_name)
            .ok_or_else(|| format!("OpenAI has no voice named {}", voice_name))?;

        let request = CreateSpeechRequest {
            model: Self::parse_model(&self.model),
            input: text.to_string(),
            voice: openai_voice,
            response_format: Some(SpeechResponseFormat::Mp3),
            speed: voice.speed.map(|speed| speed.clamp(MIN_SPEED, MAX_SPEED)),
        };

        let response = self.client.audio().speech(request).await.map_err(|e| {
            tracing::error!(
                error = %e,
                model = %self.model,
                voice = %voice_name,
                text_length = text.len(),
                "OpenAI TTS API call failed"
            );
            format!("OpenAI TTS error: {}", e)
        })?;

        let audio_data = response.bytes.to_vec();

        let duration = start_time.elapsed();
        let characters_count = text.len();
        let throughput_chars_per_sec = if duration.as_secs_f64() > 0.0 {
            characters_count as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        tracing::info!(
            provider = "openai",
            model = %self.model,
            voice = %voice_name,
            latency_ms = duration.as_millis(),
            characters_count = characters_count,
            audio_size_bytes = audio_data.len(),
            throughput_chars_per_sec = format!("{:.2}", throughput_chars_per_sec),
            "TTS chunk generated"
        );

        Ok(audio_data)
    }
}
