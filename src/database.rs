// src/database.rs
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::config::StoreBackend;
use crate::store::memory::InMemoryStore;
use crate::store::postgres::PgStore;
use crate::store::{InventoryStore, StoreError};

pub async fn create_store(backend: &StoreBackend) -> Result<Arc<dyn InventoryStore>, StoreError> {
    match backend {
        StoreBackend::Postgres { url, max_connections } => {
            let pool = PgPoolOptions::new()
                .max_connections(*max_connections)
                .connect(url)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!(max_connections, "Connected to Postgres, migrations applied");
            Ok(Arc::new(PgStore::new(pool)))
        }
        StoreBackend::InMemory => {
            info!("Using in-memory store; data is lost on shutdown");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}
