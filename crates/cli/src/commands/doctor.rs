use showroom_agent::factory::create_generator;
use showroom_core::config::{AppConfig, ConfigOverrides, GenerationProvider, LoadOptions};
use showroom_db::connect_with_settings;

/// Validates configuration, database connectivity, and text-generation
/// backend readiness. Always exits successfully; findings go to stdout.
pub async fn run() -> anyhow::Result<()> {
    let config = match AppConfig::load(LoadOptions {
        overrides: ConfigOverrides::default(),
        ..LoadOptions::default()
    }) {
        Ok(config) => {
            println!("config: ok");
            config
        }
        Err(error) => {
            println!("config: FAILED ({error})");
            return Ok(());
        }
    };

    println!("  database.url = {}", config.database.url);
    println!("  llm.provider = {:?}", config.llm.provider);
    println!("  server = {}:{}", config.server.bind_address, config.server.port);

    match connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    {
        Ok(pool) => {
            match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&pool).await {
                Ok(_) => println!("database: ok"),
                Err(error) => println!("database: FAILED ({error})"),
            }
            pool.close().await;
        }
        Err(error) => println!("database: FAILED ({error})"),
    }

    let generator = create_generator(&config.llm).await;
    let available = generator.is_available().await;
    match (config.llm.provider, available) {
        (GenerationProvider::Deterministic, _) => println!("generator: deterministic (always ok)"),
        (_, true) => println!("generator: {} reachable", generator.name()),
        (_, false) => {
            println!("generator: {} unreachable (conversation will degrade)", generator.name())
        }
    }

    Ok(())
}
