use std::sync::Arc;

use tracing::{info, warn};

use showroom_core::config::{GenerationProvider, LlmConfig};

use crate::deterministic::RuleBasedGenerator;
use crate::generation::TextGenerator;
use crate::ollama::OllamaGenerator;

/// Builds the configured generation variant. Construction never fails:
/// a misconfigured or unreachable model backend degrades to the
/// deterministic variant, with a log line saying so.
pub async fn create_generator(config: &LlmConfig) -> Arc<dyn TextGenerator> {
    match config.provider {
        GenerationProvider::Deterministic => Arc::new(RuleBasedGenerator::new()),
        GenerationProvider::Ollama => match OllamaGenerator::from_config(config) {
            Ok(generator) => Arc::new(generator),
            Err(error) => {
                warn!(
                    event_name = "agent.factory.fallback",
                    requested = "ollama",
                    error = %error,
                    "could not construct the ollama generator; using the deterministic one"
                );
                Arc::new(RuleBasedGenerator::new())
            }
        },
        GenerationProvider::Auto => create_auto(config).await,
    }
}

async fn create_auto(config: &LlmConfig) -> Arc<dyn TextGenerator> {
    match OllamaGenerator::from_config(config) {
        Ok(generator) => {
            if generator.is_available().await {
                info!(
                    event_name = "agent.factory.selected",
                    generator = "ollama",
                    model = generator.model(),
                    "model backend is reachable"
                );
                return Arc::new(generator);
            }
            info!(
                event_name = "agent.factory.selected",
                generator = "deterministic",
                "model backend is unreachable; using the deterministic generator"
            );
            Arc::new(RuleBasedGenerator::new())
        }
        Err(error) => {
            warn!(
                event_name = "agent.factory.fallback",
                requested = "auto",
                error = %error,
                "could not construct the ollama generator; using the deterministic one"
            );
            Arc::new(RuleBasedGenerator::new())
        }
    }
}
