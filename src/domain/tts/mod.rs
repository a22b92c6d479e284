pub mod language;
pub mod text;
pub mod voice;

pub use language::{LanguageCode, LanguageGuesser};
pub use text::clean_text;
pub use voice::VoiceParameters;
