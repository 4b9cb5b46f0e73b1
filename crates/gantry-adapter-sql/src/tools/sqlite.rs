//! SQLite tool kinds: `sqlite-sql` and `sqlite-execute-sql`.

use super::{ExecuteSqlConfig, SqlTool, SqlToolConfig, decode_named};
use crate::sources::sqlite;
use gantry_core::{ConfigError, SourceMap, Tool, ToolConfig};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::sync::Arc;

pub const SQL_KIND: &str = "sqlite-sql";
pub const EXECUTE_SQL_KIND: &str = "sqlite-execute-sql";

const COMPATIBLE_SOURCES: &[&str] = &[sqlite::KIND];

pub fn decode_sql(
    name: &str,
    value: serde_yaml::Value,
) -> Result<Box<dyn ToolConfig>, serde_yaml::Error> {
    Ok(Box::new(SqliteSqlConfig(decode_named(name, value)?)))
}

pub fn decode_execute_sql(
    name: &str,
    value: serde_yaml::Value,
) -> Result<Box<dyn ToolConfig>, serde_yaml::Error> {
    Ok(Box::new(SqliteExecuteSqlConfig(decode_named(name, value)?)))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct SqliteSqlConfig(pub SqlToolConfig);

impl ToolConfig for SqliteSqlConfig {
    fn kind(&self) -> &str {
        SQL_KIND
    }

    fn name(&self) -> &str {
        &self.0.name
    }

    fn initialize(&self, sources: &SourceMap) -> Result<Arc<dyn Tool>, ConfigError> {
        let tool: SqlTool<SqlitePool> = self.0.build(SQL_KIND, sources, COMPATIBLE_SOURCES)?;
        Ok(Arc::new(tool))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct SqliteExecuteSqlConfig(pub ExecuteSqlConfig);

impl ToolConfig for SqliteExecuteSqlConfig {
    fn kind(&self) -> &str {
        EXECUTE_SQL_KIND
    }

    fn name(&self) -> &str {
        &self.0.name
    }

    fn initialize(&self, sources: &SourceMap) -> Result<Arc<dyn Tool>, ConfigError> {
        Ok(Arc::new(self.0.build::<SqlitePool>(EXECUTE_SQL_KIND, sources, COMPATIBLE_SOURCES)?))
    }
}
