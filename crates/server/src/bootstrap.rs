use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use showroom_agent::conversation::ConversationEngine;
use showroom_agent::factory::create_generator;
use showroom_core::config::{AppConfig, ConfigError, LoadOptions};
use showroom_db::{connect_with_settings, migrations, CatalogStore, DbPool};
use showroom_gateway::{ActionHandlers, RoomRegistry, StoreSearcher};

use crate::ws::GatewayState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub handlers: Arc<ActionHandlers>,
    pub engine: Arc<ConversationEngine>,
    pub rooms: Arc<RoomRegistry>,
    pub generator_name: &'static str,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let store = CatalogStore::new(db_pool.clone());
    let generator = create_generator(&config.llm).await;
    let generator_name = generator.name();
    info!(
        event_name = "system.bootstrap.generator_selected",
        generator = generator_name,
        "text generation variant selected"
    );

    let engine =
        Arc::new(ConversationEngine::new(generator, Arc::new(StoreSearcher::new(store.clone()))));
    let handlers = Arc::new(ActionHandlers::new(store));
    let rooms = Arc::new(RoomRegistry::new());

    Ok(Application { config, db_pool, handlers, engine, rooms, generator_name })
}

impl Application {
    pub fn gateway_state(&self) -> GatewayState {
        GatewayState {
            handlers: self.handlers.clone(),
            engine: self.engine.clone(),
            rooms: self.rooms.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use showroom_core::config::{AppConfig, ConfigOverrides, GenerationProvider, LoadOptions};

    use super::{bootstrap, bootstrap_with_config};

    fn test_options(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                llm_provider: Some(GenerationProvider::Deterministic),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_runs_migrations_and_wires_the_gateway() {
        let app = bootstrap(test_options("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('brand', 'color', 'engine', 'car_model', 'car_name', 'car')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("catalog tables should exist after bootstrap");
        assert_eq!(table_count, 6);

        assert_eq!(app.generator_name, "deterministic");
        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_rejects_invalid_configuration() {
        let mut config = AppConfig::default();
        config.database.url = "postgres://not-sqlite".to_string();
        assert!(config.validate().is_err());

        let result = bootstrap_with_config(config).await;
        assert!(result.is_err(), "non-sqlite urls cannot connect");
    }
}
