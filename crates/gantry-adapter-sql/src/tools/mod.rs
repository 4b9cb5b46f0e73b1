//! SQL tool kinds.
//!
//! Two shapes cover every kind in this crate:
//!
//! - [`SqlTool`]: a fixed statement with positional parameters and optional
//!   `{{.name}}` template parameters rendered into the statement text.
//! - [`ExecuteSqlTool`]: runs whatever statement the caller passes in `sql`.
//!
//! Both are generic over the pool type, so the Postgres and SQLite kinds
//! differ only in the capability they ask their source for.

pub mod postgres;
pub mod sqlite;

use crate::executor::{SqlExecutor, SqlParam, rows_to_value};
use async_trait::async_trait;
use gantry_core::parameters::{get_params, process_parameters, resolve_template_params};
use gantry_core::sources::compatible_source;
use gantry_core::{
    AccessToken, ConfigError, ParamError, ParamValues, Parameter, Parameters, SourceMap, Tool,
    ToolAnnotations, ToolError,
};
use serde::Deserialize;
use serde_json::Value;

/// Config shared by every fixed-statement SQL kind.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SqlToolConfig {
    #[serde(skip)]
    pub name: String,
    pub source: String,
    pub description: String,
    pub statement: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub template_parameters: Vec<Parameter>,
    #[serde(default)]
    pub auth_required: Vec<String>,
    #[serde(default)]
    pub annotations: Option<ToolAnnotations>,
}

impl SqlToolConfig {
    pub fn build<E: SqlExecutor>(
        &self,
        kind: &'static str,
        sources: &SourceMap,
        compatible_kinds: &[&str],
    ) -> Result<SqlTool<E>, ConfigError> {
        let executor: E = compatible_source(sources, &self.source, kind, compatible_kinds)?;
        let (all_params, _) = process_parameters(&self.template_parameters, &self.parameters)
            .map_err(|source| self.param_error(source))?;
        Ok(SqlTool {
            name: self.name.clone(),
            kind,
            description: self.description.clone(),
            statement: self.statement.clone(),
            statement_params: self.parameters.clone(),
            template_params: self.template_parameters.clone(),
            all_params,
            auth_required: self.auth_required.clone(),
            annotations: self.annotations.clone(),
            executor,
        })
    }

    fn param_error(&self, source: ParamError) -> ConfigError {
        ConfigError::Parameter {
            what: "tool",
            name: self.name.clone(),
            source,
        }
    }
}

/// A fixed statement bound to one pool.
pub struct SqlTool<E> {
    name: String,
    kind: &'static str,
    description: String,
    statement: String,
    statement_params: Vec<Parameter>,
    template_params: Vec<Parameter>,
    all_params: Parameters,
    auth_required: Vec<String>,
    annotations: Option<ToolAnnotations>,
    executor: E,
}

impl<E> SqlTool<E> {
    pub fn statement(&self) -> &str {
        &self.statement
    }
}

#[async_trait]
impl<E: SqlExecutor> Tool for SqlTool<E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        self.kind
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &Parameters {
        &self.all_params
    }

    fn auth_required(&self) -> &[String] {
        &self.auth_required
    }

    fn annotations(&self) -> Option<&ToolAnnotations> {
        self.annotations.as_ref()
    }

    async fn invoke(
        &self,
        params: ParamValues,
        _access_token: &AccessToken,
    ) -> Result<Value, ToolError> {
        let values = params.as_map();
        let statement = resolve_template_params(&self.template_params, &self.statement, &values)?;
        let bound: Vec<SqlParam> = get_params(&self.statement_params, &values)
            .as_slice()
            .into_iter()
            .zip(&self.statement_params)
            .map(|(value, param)| SqlParam::declared(value, param))
            .collect();

        tracing::debug!(
            tool = %self.name,
            statement = %statement,
            params = bound.len(),
            "executing sql"
        );
        let rows = self
            .executor
            .fetch_rows(&statement, &bound)
            .await
            .map_err(|e| ToolError::execution("unable to execute query", e))?;
        Ok(rows_to_value(rows))
    }
}

/// Config shared by the `*-execute-sql` kinds.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExecuteSqlConfig {
    #[serde(skip)]
    pub name: String,
    pub source: String,
    pub description: String,
    #[serde(default)]
    pub auth_required: Vec<String>,
    #[serde(default)]
    pub annotations: Option<ToolAnnotations>,
}

impl ExecuteSqlConfig {
    pub fn build<E: SqlExecutor>(
        &self,
        kind: &'static str,
        sources: &SourceMap,
        compatible_kinds: &[&str],
    ) -> Result<ExecuteSqlTool<E>, ConfigError> {
        let executor: E = compatible_source(sources, &self.source, kind, compatible_kinds)?;
        Ok(ExecuteSqlTool {
            name: self.name.clone(),
            kind,
            description: self.description.clone(),
            params: vec![Parameter::string("sql", "The sql to execute.")].into(),
            auth_required: self.auth_required.clone(),
            annotations: self.annotations.clone(),
            executor,
        })
    }
}

/// Runs arbitrary caller-supplied SQL.
pub struct ExecuteSqlTool<E> {
    name: String,
    kind: &'static str,
    description: String,
    params: Parameters,
    auth_required: Vec<String>,
    annotations: Option<ToolAnnotations>,
    executor: E,
}

#[async_trait]
impl<E: SqlExecutor> Tool for ExecuteSqlTool<E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        self.kind
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &Parameters {
        &self.params
    }

    fn auth_required(&self) -> &[String] {
        &self.auth_required
    }

    fn annotations(&self) -> Option<&ToolAnnotations> {
        self.annotations.as_ref()
    }

    async fn invoke(
        &self,
        params: ParamValues,
        _access_token: &AccessToken,
    ) -> Result<Value, ToolError> {
        let sql = params
            .get("sql")
            .and_then(Value::as_str)
            .ok_or_else(|| ParamError::Missing("sql".to_string()))?;

        tracing::debug!(tool = %self.name, statement = %sql, "executing caller sql");
        let rows = self
            .executor
            .fetch_rows(sql, &[])
            .await
            .map_err(|e| ToolError::execution("unable to execute query", e))?;
        Ok(rows_to_value(rows))
    }
}

/// Decodes `value` into `T` and stamps the resource name on it.
pub(crate) fn decode_named<T>(name: &str, value: serde_yaml::Value) -> Result<T, serde_yaml::Error>
where
    T: serde::de::DeserializeOwned + Named,
{
    let mut config: T = serde_yaml::from_value(value)?;
    config.set_name(name);
    Ok(config)
}

pub(crate) trait Named {
    fn set_name(&mut self, name: &str);
}

impl Named for SqlToolConfig {
    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }
}

impl Named for ExecuteSqlConfig {
    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::executor::SqlExecutor;
    use crate::sources::SqliteSource;
    use gantry_core::{Source, SourceMap};
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;

    /// An in-memory database with a seeded `users` table, registered as
    /// source `my-sqlite`.
    pub async fn seeded_sources() -> (SourceMap, SqlitePool) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        pool.fetch_rows("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)", &[])
            .await
            .unwrap();
        pool.fetch_rows("INSERT INTO users (id, name) VALUES (1, 'Alice'), (3, 'Sid')", &[])
            .await
            .unwrap();

        let mut sources = SourceMap::new();
        sources.insert(
            "my-sqlite".into(),
            Arc::new(SqliteSource::new("my-sqlite", pool.clone())) as Arc<dyn Source>,
        );
        (sources, pool)
    }
}
