//! The `postgres` source kind.
//!
//! ```yaml
//! sources:
//!   my-pg:
//!     kind: postgres
//!     host: 127.0.0.1
//!     port: 5432
//!     user: ${PG_USER}
//!     password: ${PG_PASSWORD}
//!     database: app
//!     queryParams:
//!       sslmode: require
//! ```

use async_trait::async_trait;
use gantry_core::sources::{Source, SourceConfig};
use serde::Deserialize;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

pub const KIND: &str = "postgres";

/// Factory registered for [`KIND`].
pub fn decode(
    name: &str,
    value: serde_yaml::Value,
) -> Result<Box<dyn SourceConfig>, serde_yaml::Error> {
    let mut config: PostgresSourceConfig = serde_yaml::from_value(value)?;
    config.name = name.to_string();
    Ok(Box::new(config))
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PostgresSourceConfig {
    #[serde(skip)]
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Extra connection parameters, e.g. `sslmode` or `application_name`.
    #[serde(default)]
    pub query_params: BTreeMap<String, String>,
}

fn default_port() -> u16 {
    5432
}

impl std::fmt::Debug for PostgresSourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresSourceConfig")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("database", &self.database)
            .field("query_params", &self.query_params)
            .finish()
    }
}

impl PostgresSourceConfig {
    pub fn connect_options(&self) -> anyhow::Result<PgConnectOptions> {
        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database);

        let mut runtime_params = Vec::new();
        for (key, value) in &self.query_params {
            match key.as_str() {
                "sslmode" => {
                    let mode = PgSslMode::from_str(value)
                        .map_err(|e| anyhow::anyhow!("invalid sslmode {value:?}: {e}"))?;
                    options = options.ssl_mode(mode);
                }
                "sslrootcert" => options = options.ssl_root_cert(value),
                "application_name" => options = options.application_name(value),
                _ => runtime_params.push((key.as_str(), value.as_str())),
            }
        }
        if !runtime_params.is_empty() {
            options = options.options(runtime_params);
        }
        Ok(options)
    }

    /// Connection URL with the password masked, for logging.
    pub fn redacted_url(&self) -> String {
        let mut url = format!(
            "postgres://{}:****@{}:{}/{}",
            self.user, self.host, self.port, self.database
        );
        let query: Vec<String> = self
            .query_params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }
}

#[async_trait]
impl SourceConfig for PostgresSourceConfig {
    fn kind(&self) -> &str {
        KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> anyhow::Result<Arc<dyn Source>> {
        tracing::debug!(source = %self.name, url = %self.redacted_url(), "connecting to postgres");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(self.connect_options()?)
            .await?;
        Ok(Arc::new(PostgresSource {
            name: self.name.clone(),
            pool,
        }))
    }
}

pub struct PostgresSource {
    name: String,
    pool: PgPool,
}

impl PostgresSource {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Source for PostgresSource {
    fn kind(&self) -> &str {
        KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn capability(&self, id: TypeId) -> Option<&(dyn Any + Send + Sync)> {
        (id == TypeId::of::<PgPool>()).then_some(&self.pool as &(dyn Any + Send + Sync))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
