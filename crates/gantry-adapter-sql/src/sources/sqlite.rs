//! The `sqlite` source kind.
//!
//! ```yaml
//! sources:
//!   local:
//!     kind: sqlite
//!     database: ./data/app.db   # or ":memory:"
//! ```

use async_trait::async_trait;
use gantry_core::sources::{Source, SourceConfig};
use serde::Deserialize;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::any::{Any, TypeId};
use std::str::FromStr;
use std::sync::Arc;

pub const KIND: &str = "sqlite";

const IN_MEMORY: &str = ":memory:";

/// Factory registered for [`KIND`].
pub fn decode(
    name: &str,
    value: serde_yaml::Value,
) -> Result<Box<dyn SourceConfig>, serde_yaml::Error> {
    let mut config: SqliteSourceConfig = serde_yaml::from_value(value)?;
    config.name = name.to_string();
    Ok(Box::new(config))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SqliteSourceConfig {
    #[serde(skip)]
    pub name: String,
    /// Database file path, or `:memory:`.
    pub database: String,
}

impl SqliteSourceConfig {
    pub fn is_in_memory(&self) -> bool {
        self.database == IN_MEMORY
    }

    pub async fn connect(&self) -> anyhow::Result<SqlitePool> {
        // An in-memory database lives only as long as its connection, so the
        // pool holds exactly one and never recycles it.
        let pool = if self.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
                .await?
        } else {
            let options = SqliteConnectOptions::new()
                .filename(&self.database)
                .create_if_missing(true);
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };
        Ok(pool)
    }
}

#[async_trait]
impl SourceConfig for SqliteSourceConfig {
    fn kind(&self) -> &str {
        KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> anyhow::Result<Arc<dyn Source>> {
        tracing::debug!(source = %self.name, database = %self.database, "opening sqlite database");
        let pool = self.connect().await?;
        Ok(Arc::new(SqliteSource {
            name: self.name.clone(),
            pool,
        }))
    }
}

pub struct SqliteSource {
    name: String,
    pool: SqlitePool,
}

impl SqliteSource {
    pub fn new(name: impl Into<String>, pool: SqlitePool) -> Self {
        Self {
            name: name.into(),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Source for SqliteSource {
    fn kind(&self) -> &str {
        KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn capability(&self, id: TypeId) -> Option<&(dyn Any + Send + Sync)> {
        (id == TypeId::of::<SqlitePool>()).then_some(&self.pool as &(dyn Any + Send + Sync))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
