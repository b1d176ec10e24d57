use anyhow::Context;
use showroom_core::config::ConfigOverrides;
use showroom_db::migrations;

pub async fn run() -> anyhow::Result<()> {
    let (config, pool) = super::load_config_and_pool(ConfigOverrides::default()).await?;

    migrations::run_pending(&pool).await.context("migrations failed")?;
    println!("migrations applied to {}", config.database.url);

    pool.close().await;
    Ok(())
}
