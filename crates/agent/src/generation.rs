use async_trait::async_trait;
use thiserror::Error;

/// What the generation call is for. Each task carries its own fixed
/// sampling budget; callers never pick temperatures ad hoc.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    ExtractPreferences,
    GenerateQuestion,
    FormatResults,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationProfile {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl TaskKind {
    pub fn profile(&self) -> GenerationProfile {
        match self {
            Self::ExtractPreferences => GenerationProfile { temperature: 0.1, max_tokens: 200 },
            Self::GenerateQuestion => GenerationProfile { temperature: 0.7, max_tokens: 150 },
            Self::FormatResults => GenerationProfile { temperature: 0.5, max_tokens: 1500 },
        }
    }
}

#[derive(Clone, Debug)]
pub struct GenerationRequest {
    pub task: TaskKind,
    pub system_prompt: String,
    pub prompt: String,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("backend timed out after {0}s")]
    Timeout(u64),
    #[error("backend request failed: {0}")]
    Request(String),
    #[error("backend returned an unusable response: {0}")]
    Malformed(String),
}

/// The pluggable text-generation capability.
///
/// Implementations must never panic on backend trouble: they report it
/// through [`GenerationError`] and the callers degrade gracefully.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn is_available(&self) -> bool;

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}
