//! Shared application state for all routes.

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::model::Model;
use crate::registry::ResponseRegistry;
use crate::schema::{auth_schema, events_schema};
use crate::service::{ServiceFactory, Table};
use crate::store::{JsonFileStore, KvStore, MemoryStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub factory: ServiceFactory,
    pub registry: Arc<ResponseRegistry>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Opens one store per table: JSON files under `db_path`, or memory.
    pub async fn open(config: ServerConfig) -> Result<Self, AppError> {
        let events = open_store(&config, "events").await?;
        let auth = open_store(&config, "auth").await?;
        Self::with_stores(config, events, auth)
    }

    /// Events soft-delete; auth records are removed outright.
    pub fn with_stores(
        config: ServerConfig,
        events: Arc<dyn KvStore>,
        auth: Arc<dyn KvStore>,
    ) -> Result<Self, AppError> {
        let events = Table::with_max_id_gap(
            Model::new(Arc::new(events_schema()?), events, true),
            config.max_id_gap,
        );
        let auth = Table::new(Model::new(Arc::new(auth_schema()?), auth, false));
        let factory = ServiceFactory::new(Arc::new(events), Arc::new(auth), config.auth_settings());
        Ok(Self {
            factory,
            registry: Arc::new(ResponseRegistry::standard()),
            config: Arc::new(config),
        })
    }
}

async fn open_store(config: &ServerConfig, table: &str) -> Result<Arc<dyn KvStore>, AppError> {
    match config.store_path(table) {
        Some(path) => {
            tracing::info!(table, path = %path.display(), "using file store");
            Ok(Arc::new(JsonFileStore::open(path).await?))
        }
        None => {
            tracing::info!(table, "using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
