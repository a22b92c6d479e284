use crate::domain::narration::Provider;
use crate::domain::tts::VoiceParameters;
use async_trait::async_trait;

/// Repository for single-chunk speech generation.
/// Abstracts the underlying TTS provider (AWS Polly, OpenAI, ...).
///
/// Implementations only map voice parameters to the provider request; text
/// is already chunked to the provider's limit and batching, rate limiting
/// and ordering all happen in the batch scheduler.
#[async_trait]
pub trait TtsRepository: Send + Sync {
    fn provider(&self) -> Provider;

    /// Whether a requested voice name exists for this provider.
    /// Checked before a run is created, so no chunk is generated with a
    /// voice nobody asked for.
    fn supports_voice(&self, _voice: &str) -> bool {
        true
    }

    /// Generate MP3 audio for one chunk of text
    ///
    /// # Errors
    /// Every provider or transport failure comes back as `Err` with a
    /// human-readable message; implementations must not panic on them.
    async fn generate(&self, text: &str, voice: &VoiceParameters) -> Result<Vec<u8>, String>;
}
