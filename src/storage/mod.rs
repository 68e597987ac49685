pub mod memory;
pub mod postgres;
pub mod sqlite;
pub mod trait_def;

mod rows;

pub use memory::InMemoryStorage;
pub use postgres::PostgresStorage;
pub use sqlite::SqliteStorage;
pub use trait_def::{CityRepository, Storage, StorageError, StorageResult, WeatherRepository};

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::config::{DatabaseBackend, DatabaseConfig};

/// Open the configured backend and make sure its schema exists
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config.backend {
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", config.url);
            Arc::new(SqliteStorage::new(&config.url, config.max_connections).await?)
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage: {}", config.url);
            Arc::new(PostgresStorage::new(&config.url, config.max_connections).await?)
        }
    };

    info!("Initializing database...");
    storage.init().await?;
    info!("Database initialized successfully");

    Ok(storage)
}
