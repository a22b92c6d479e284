use super::language::LanguageCode;
use serde::Serialize;

/// Provider-neutral voice selection passed with every chunk generation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceParameters {
    /// Provider voice name; `None` lets the provider pick one for `language`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    pub language: LanguageCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
}

impl VoiceParameters {
    pub fn for_language(language: LanguageCode) -> Self {
        Self {
            voice: None,
            language,
            speed: None,
        }
    }
}
