use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use showroom_agent::conversation::{ConversationEngine, ConversationSession};
use showroom_agent::factory::create_generator;
use showroom_core::config::ConfigOverrides;
use showroom_db::{migrations, CatalogStore};
use showroom_gateway::StoreSearcher;

const EXIT_WORDS: [&str; 3] = ["exit", "quit", "bye"];

/// Interactive (or piped) terminal session against the same
/// conversation engine the gateway serves.
pub async fn run(
    provider: &str,
    ollama_url: Option<String>,
    model: Option<String>,
) -> anyhow::Result<()> {
    let overrides = ConfigOverrides {
        llm_provider: Some(provider.parse().context("invalid --provider value")?),
        llm_base_url: ollama_url,
        llm_model: model,
        ..ConfigOverrides::default()
    };

    let (config, pool) = super::load_config_and_pool(overrides).await?;
    migrations::run_pending(&pool).await.context("migrations failed")?;

    let store = CatalogStore::new(pool.clone());
    let generator = create_generator(&config.llm).await;
    let generator_name = generator.name();
    let engine = ConversationEngine::new(generator, Arc::new(StoreSearcher::new(store)));
    let mut session = ConversationSession::new();

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(
            format!(
                "Showroom assistant ({generator_name}). Tell me what car you are looking \
                 for; type `exit` to leave.\n"
            )
            .as_bytes(),
        )
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"\nyou> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&input.to_lowercase().as_str()) {
            break;
        }

        let reply = engine.take_turn(&mut session, input).await;
        stdout.write_all(format!("\nassistant> {reply}\n").as_bytes()).await?;
    }

    stdout
        .write_all(
            format!("\nThanks for visiting. Searches this session: {}\n", session.history.len())
                .as_bytes(),
        )
        .await?;

    pool.close().await;
    Ok(())
}
