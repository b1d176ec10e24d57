use anyhow::Context;
use showroom_core::config::ConfigOverrides;
use showroom_db::{migrations, seed_catalog};

pub async fn run() -> anyhow::Result<()> {
    let (config, pool) = super::load_config_and_pool(ConfigOverrides::default()).await?;

    migrations::run_pending(&pool).await.context("migrations failed")?;
    let summary = seed_catalog(&pool).await.context("seeding the demo catalog failed")?;

    println!("seeded {}:", config.database.url);
    println!("  {} brands", summary.brands);
    println!("  {} colors", summary.colors);
    println!("  {} engines", summary.engines);
    println!("  {} car models", summary.car_models);
    println!("  {} car names", summary.car_names);
    println!("  {} cars", summary.cars);

    pool.close().await;
    Ok(())
}
