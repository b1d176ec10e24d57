use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use showroom_core::config::LlmConfig;

use crate::generation::{GenerationError, GenerationRequest, TextGenerator};

const AVAILABILITY_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Ollama-backed implementing variant of the generation capability.
///
/// Requests carry the per-task sampling profile and the configured
/// timeout; a timeout or connection failure surfaces as a typed error so
/// callers can degrade instead of blocking a connection.
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaGenerator {
    pub fn from_config(config: &LlmConfig) -> Result<Self, GenerationError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| GenerationError::Request("ollama base_url is not configured".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|error| GenerationError::Request(error.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs.max(1),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn compose_prompt(request: &GenerationRequest) -> String {
        if request.system_prompt.is_empty() {
            return request.prompt.clone();
        }
        format!("System: {}\n\nUser: {}", request.system_prompt, request.prompt)
    }

    fn map_error(&self, error: reqwest::Error) -> GenerationError {
        if error.is_timeout() {
            return GenerationError::Timeout(self.timeout_secs);
        }
        if error.is_connect() {
            return GenerationError::Unavailable(error.to_string());
        }
        GenerationError::Request(error.to_string())
    }
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
    top_p: f32,
    top_k: u32,
    repeat_penalty: f32,
    stop: [&'static str; 2],
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn is_available(&self) -> bool {
        let probe = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(AVAILABILITY_PROBE_TIMEOUT)
            .send()
            .await;

        match probe {
            Ok(response) => response.status().is_success(),
            Err(error) => {
                warn!(
                    event_name = "agent.ollama.probe_failed",
                    base_url = %self.base_url,
                    error = %error,
                    "ollama availability probe failed"
                );
                false
            }
        }
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let profile = request.task.profile();
        let body = GenerateBody {
            model: &self.model,
            prompt: Self::compose_prompt(request),
            stream: false,
            options: GenerateOptions {
                temperature: profile.temperature,
                num_predict: profile.max_tokens,
                top_p: 0.9,
                top_k: 40,
                repeat_penalty: 1.1,
                stop: ["User:", "System:"],
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|error| self.map_error(error))?
            .error_for_status()
            .map_err(|error| self.map_error(error))?;

        let payload: GenerateResponse =
            response.json().await.map_err(|error| GenerationError::Malformed(error.to_string()))?;

        Ok(payload.response)
    }
}

#[cfg(test)]
mod tests {
    use showroom_core::config::{AppConfig, LlmConfig};

    use super::OllamaGenerator;
    use crate::generation::{GenerationRequest, TaskKind};

    fn llm_config() -> LlmConfig {
        AppConfig::default().llm
    }

    #[test]
    fn base_url_is_required_and_trailing_slashes_are_trimmed() {
        let mut config = llm_config();
        config.base_url = None;
        assert!(OllamaGenerator::from_config(&config).is_err());

        config.base_url = Some("http://localhost:11434/".to_string());
        let generator = OllamaGenerator::from_config(&config).expect("valid config");
        assert_eq!(generator.base_url, "http://localhost:11434");
    }

    #[test]
    fn system_prompt_composes_into_a_single_prompt() {
        let request = GenerationRequest {
            task: TaskKind::ExtractPreferences,
            system_prompt: "Be terse.".to_string(),
            prompt: "A red Fiat.".to_string(),
        };
        let composed = OllamaGenerator::compose_prompt(&request);
        assert!(composed.starts_with("System: Be terse."));
        assert!(composed.ends_with("User: A red Fiat."));
    }
}
