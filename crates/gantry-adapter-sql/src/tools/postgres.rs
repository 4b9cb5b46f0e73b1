//! Postgres tool kinds: `postgres-sql`, `postgres-execute-sql` and
//! `postgres-list-schemas`.

use super::{ExecuteSqlConfig, SqlTool, SqlToolConfig, decode_named};
use crate::sources::postgres;
use gantry_core::parameters::Parameter;
use gantry_core::{ConfigError, SourceMap, Tool, ToolAnnotations, ToolConfig};
use regex::Regex;
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::{Arc, LazyLock};

pub const SQL_KIND: &str = "postgres-sql";
pub const EXECUTE_SQL_KIND: &str = "postgres-execute-sql";
pub const LIST_SCHEMAS_KIND: &str = "postgres-list-schemas";

const COMPATIBLE_SOURCES: &[&str] = &[postgres::KIND];

const LIST_SCHEMAS_DESCRIPTION: &str = "Lists all schemas in the database ordered by schema name \
    and excluding system and temporary schemas. It returns the schema name, schema owner, grants, \
    number of functions, number of tables and number of views within each schema.";

const LIST_SCHEMAS_STATEMENT: &str = r#"
WITH
schema_grants AS (
    SELECT schema_oid, jsonb_object_agg(grantee, privileges) AS grants
    FROM (
        SELECT
            n.oid AS schema_oid,
            CASE
                WHEN p.grantee = 0 THEN 'PUBLIC'
                ELSE pg_catalog.pg_get_userbyid(p.grantee)
            END AS grantee,
            jsonb_agg(p.privilege_type ORDER BY p.privilege_type) AS privileges
        FROM pg_catalog.pg_namespace n, aclexplode(n.nspacl) p
        WHERE n.nspacl IS NOT NULL
        GROUP BY n.oid, grantee
    ) permissions_by_grantee
    GROUP BY schema_oid
),
all_schemas AS (
    SELECT
        n.nspname AS schema_name,
        pg_catalog.pg_get_userbyid(n.nspowner) AS owner,
        COALESCE(sg.grants, '{}'::jsonb) AS grants,
        (SELECT COUNT(*) FROM pg_catalog.pg_class c
            WHERE c.relnamespace = n.oid AND c.relkind = 'r') AS tables,
        (SELECT COUNT(*) FROM pg_catalog.pg_class c
            WHERE c.relnamespace = n.oid AND c.relkind = 'v') AS views,
        (SELECT COUNT(*) FROM pg_catalog.pg_proc p WHERE p.pronamespace = n.oid) AS functions
    FROM pg_catalog.pg_namespace n
    LEFT JOIN schema_grants sg ON n.oid = sg.schema_oid
)
SELECT *
FROM all_schemas
WHERE schema_name NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
  AND schema_name NOT LIKE 'pg_temp_%'
  AND ($1::text IS NULL OR schema_name LIKE '%' || $1::text || '%')
ORDER BY schema_name
"#;

pub fn decode_sql(
    name: &str,
    value: serde_yaml::Value,
) -> Result<Box<dyn ToolConfig>, serde_yaml::Error> {
    Ok(Box::new(PostgresSqlConfig(decode_named(name, value)?)))
}

pub fn decode_execute_sql(
    name: &str,
    value: serde_yaml::Value,
) -> Result<Box<dyn ToolConfig>, serde_yaml::Error> {
    Ok(Box::new(PostgresExecuteSqlConfig(decode_named(name, value)?)))
}

pub fn decode_list_schemas(
    name: &str,
    value: serde_yaml::Value,
) -> Result<Box<dyn ToolConfig>, serde_yaml::Error> {
    let mut config: ListSchemasConfig = serde_yaml::from_value(value)?;
    config.name = name.to_string();
    Ok(Box::new(config))
}

static POSITIONAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+)").expect("valid regex"));

/// Highest `$n` placeholder referenced by `statement`, or 0.
pub fn highest_placeholder(statement: &str) -> usize {
    POSITIONAL
        .captures_iter(statement)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<usize>().ok())
        .max()
        .unwrap_or(0)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct PostgresSqlConfig(pub SqlToolConfig);

impl ToolConfig for PostgresSqlConfig {
    fn kind(&self) -> &str {
        SQL_KIND
    }

    fn name(&self) -> &str {
        &self.0.name
    }

    fn initialize(&self, sources: &SourceMap) -> Result<Arc<dyn Tool>, ConfigError> {
        let highest = highest_placeholder(&self.0.statement);
        if highest > self.0.parameters.len() {
            return Err(ConfigError::Invalid {
                what: "tool",
                name: self.0.name.clone(),
                reason: format!(
                    "statement references ${highest} but only {} parameters are declared",
                    self.0.parameters.len()
                ),
            });
        }
        let tool: SqlTool<PgPool> = self.0.build(SQL_KIND, sources, COMPATIBLE_SOURCES)?;
        Ok(Arc::new(tool))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct PostgresExecuteSqlConfig(pub ExecuteSqlConfig);

impl ToolConfig for PostgresExecuteSqlConfig {
    fn kind(&self) -> &str {
        EXECUTE_SQL_KIND
    }

    fn name(&self) -> &str {
        &self.0.name
    }

    fn initialize(&self, sources: &SourceMap) -> Result<Arc<dyn Tool>, ConfigError> {
        Ok(Arc::new(self.0.build::<PgPool>(EXECUTE_SQL_KIND, sources, COMPATIBLE_SOURCES)?))
    }
}

/// Prebuilt tool listing user schemas, optionally filtered by a name pattern.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ListSchemasConfig {
    #[serde(skip)]
    pub name: String,
    pub source: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub auth_required: Vec<String>,
}

impl ListSchemasConfig {
    fn as_sql_config(&self) -> SqlToolConfig {
        let description = if self.description.is_empty() {
            LIST_SCHEMAS_DESCRIPTION.to_string()
        } else {
            self.description.clone()
        };
        SqlToolConfig {
            name: self.name.clone(),
            source: self.source.clone(),
            description,
            statement: LIST_SCHEMAS_STATEMENT.to_string(),
            parameters: vec![Parameter::string(
                "schema_name",
                "Optional: A specific schema name pattern to search for.",
            )
            .with_default(serde_json::json!(""))],
            template_parameters: Vec::new(),
            auth_required: self.auth_required.clone(),
            annotations: Some(ToolAnnotations {
                read_only_hint: Some(true),
                ..Default::default()
            }),
        }
    }
}

impl ToolConfig for ListSchemasConfig {
    fn kind(&self) -> &str {
        LIST_SCHEMAS_KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&self, sources: &SourceMap) -> Result<Arc<dyn Tool>, ConfigError> {
        let tool: SqlTool<PgPool> =
            self.as_sql_config()
                .build(LIST_SCHEMAS_KIND, sources, COMPATIBLE_SOURCES)?;
        Ok(Arc::new(tool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::seeded_sources;

    fn yaml(text: &str) -> serde_yaml::Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_highest_placeholder() {
        assert_eq!(highest_placeholder("SELECT 1"), 0);
        assert_eq!(highest_placeholder("SELECT * FROM t WHERE a = $1 OR b = $2"), 2);
        assert_eq!(highest_placeholder("SELECT $10, $2"), 10);
    }

    #[tokio::test]
    async fn test_placeholder_count_checked() {
        let (sources, _pool) = seeded_sources().await;
        let config = decode_sql(
            "my-tool",
            yaml(
                "source: my-sqlite\ndescription: d\nstatement: SELECT $1, $2\nparameters:\n  \
                 - {name: id, type: integer, description: x}\n",
            ),
        )
        .unwrap();
        let err = config.initialize(&sources).err().unwrap();
        assert_eq!(
            err.to_string(),
            "invalid tool \"my-tool\": statement references $2 but only 1 parameters are declared"
        );
    }

    #[tokio::test]
    async fn test_incompatible_source() {
        let (sources, _pool) = seeded_sources().await;
        let config = decode_sql(
            "my-tool",
            yaml("source: my-sqlite\ndescription: d\nstatement: SELECT 1\n"),
        )
        .unwrap();
        let err = config.initialize(&sources).err().unwrap();
        assert_eq!(
            err.to_string(),
            "invalid source for \"postgres-sql\" tool: source kind must be one of [\"postgres\"]"
        );

        let exec = decode_execute_sql("exec", yaml("source: my-sqlite\ndescription: d\n")).unwrap();
        assert!(matches!(
            exec.initialize(&sources).err().unwrap(),
            ConfigError::IncompatibleSource { .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_source() {
        let (sources, _pool) = seeded_sources().await;
        let config = decode_list_schemas("schemas", yaml("source: nope\n")).unwrap();
        let err = config.initialize(&sources).err().unwrap();
        assert!(matches!(err, ConfigError::SourceNotFound(name) if name == "nope"));
    }

    #[test]
    fn test_list_schemas_defaults() {
        let config: ListSchemasConfig = serde_yaml::from_value(yaml("source: pg\n")).unwrap();
        let sql = config.as_sql_config();
        assert_eq!(sql.description, LIST_SCHEMAS_DESCRIPTION);
        assert_eq!(sql.parameters.len(), 1);
        assert_eq!(sql.parameters[0].name, "schema_name");
        assert!(!sql.parameters[0].is_required());
        assert_eq!(highest_placeholder(&sql.statement), 1);
    }

    #[test]
    fn test_sql_config_rejects_unknown_field() {
        let err = decode_sql(
            "my-tool",
            yaml("source: pg\ndescription: d\nstatement: SELECT 1\nquery: nope\n"),
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("query"));
    }
}
