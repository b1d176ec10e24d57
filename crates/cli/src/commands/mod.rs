pub mod chat;
pub mod doctor;
pub mod migrate;
pub mod seed;

use anyhow::Context;
use showroom_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use showroom_db::{connect_with_settings, DbPool};

pub(crate) async fn load_config_and_pool(
    overrides: ConfigOverrides,
) -> anyhow::Result<(AppConfig, DbPool)> {
    let config = AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() })
        .context("could not load configuration")?;

    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .with_context(|| format!("could not open database `{}`", config.database.url))?;

    Ok((config, pool))
}
