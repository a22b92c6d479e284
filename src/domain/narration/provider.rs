use super::error::RunConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// External TTS capability a run is generated with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "polly")]
    Polly,
    #[serde(rename = "openai")]
    OpenAi,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Polly, Provider::OpenAi];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Polly => "polly",
            Provider::OpenAi => "openai",
        }
    }

    /// Static limits for this provider.
    ///
    /// Polly allows 3000 characters per request and tolerates short bursts, so
    /// it takes wide batches with a small gap. OpenAI accepts 4096 characters
    /// but low tiers are limited per minute, so batches are narrower and spaced
    /// further apart.
    pub fn profile(&self) -> ProviderProfile {
        match self {
            Provider::Polly => ProviderProfile {
                name: "polly",
                max_chunk_length: 3000,
                batch_size: 10,
                inter_batch_delay_seconds: 3,
            },
            Provider::OpenAi => ProviderProfile {
                name: "openai",
                max_chunk_length: 4096,
                batch_size: 5,
                inter_batch_delay_seconds: 15,
            },
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Provider {
    type Err = RunConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "polly" | "aws-polly" => Ok(Provider::Polly),
            "openai" | "open-ai" => Ok(Provider::OpenAi),
            other => Err(RunConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// Chunking and rate-limit settings consumed by the chunker and scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderProfile {
    pub name: &'static str,
    pub max_chunk_length: usize,
    pub batch_size: usize,
    pub inter_batch_delay_seconds: u64,
}

impl ProviderProfile {
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_secs(self.inter_batch_delay_seconds)
    }

    /// ceil(total_chunks / batch_size)
    pub fn batch_count(&self, total_chunks: usize) -> usize {
        total_chunks.div_ceil(self.batch_size.max(1))
    }
}
