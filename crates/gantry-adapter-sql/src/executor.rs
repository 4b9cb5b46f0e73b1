//! Statement execution against sqlx pools.
//!
//! Parameters arrive as JSON values and are bound positionally by their JSON
//! type. Array parameters bind as typed Postgres arrays chosen by the declared
//! item type, so `= ANY($1)` works. Rows come back as JSON objects with columns
//! in select-list order.

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use gantry_core::{Parameter, ParameterType};
use serde_json::{Map, Number, Value, json};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, PgPool, Postgres, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};
use std::str::FromStr;

pub type JsonRow = Map<String, Value>;

/// One positional statement argument.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParam {
    pub value: Value,
    /// Declared item type when the parameter is an array.
    pub item_type: Option<ParameterType>,
}

impl SqlParam {
    /// `value` as resolved for the declared parameter `param`.
    pub fn declared(value: Value, param: &Parameter) -> Self {
        Self {
            value,
            item_type: param.items.as_deref().map(|items| items.kind),
        }
    }
}

impl From<Value> for SqlParam {
    fn from(value: Value) -> Self {
        Self {
            value,
            item_type: None,
        }
    }
}

/// A pooled handle that can run one statement with positional parameters.
#[async_trait]
pub trait SqlExecutor: Clone + Send + Sync + 'static {
    async fn fetch_rows(
        &self,
        statement: &str,
        params: &[SqlParam],
    ) -> anyhow::Result<Vec<JsonRow>>;
}

#[async_trait]
impl SqlExecutor for PgPool {
    async fn fetch_rows(
        &self,
        statement: &str,
        params: &[SqlParam],
    ) -> anyhow::Result<Vec<JsonRow>> {
        let mut query = sqlx::query(statement);
        for param in params {
            query = bind_pg(query, param)?;
        }
        let rows = query.fetch_all(self).await?;
        Ok(rows.iter().map(pg_row_to_json).collect())
    }
}

#[async_trait]
impl SqlExecutor for SqlitePool {
    async fn fetch_rows(
        &self,
        statement: &str,
        params: &[SqlParam],
    ) -> anyhow::Result<Vec<JsonRow>> {
        let mut query = sqlx::query(statement);
        for param in params {
            query = bind_sqlite(query, &param.value)?;
        }
        let rows = query.fetch_all(self).await?;
        Ok(rows.iter().map(sqlite_row_to_json).collect())
    }
}

/// Rows as a JSON array, or `null` when there are none.
pub fn rows_to_value(rows: Vec<JsonRow>) -> Value {
    if rows.is_empty() {
        return Value::Null;
    }
    Value::Array(rows.into_iter().map(Value::Object).collect())
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Numeric {
    Integer(i64),
    Float(f64),
}

fn numeric(n: &Number) -> anyhow::Result<Numeric> {
    if let Some(i) = n.as_i64() {
        return Ok(Numeric::Integer(i));
    }
    match n.as_f64() {
        Some(f) if n.is_f64() => Ok(Numeric::Float(f)),
        _ => bail!("integer {n} does not fit in a 64-bit column"),
    }
}

/// Postgres array for an array parameter.
#[derive(Debug, Clone, PartialEq)]
enum PgArray {
    Integer(Vec<i64>),
    Float(Vec<f64>),
    Text(Vec<String>),
    Boolean(Vec<bool>),
}

/// Picks the array type from the declared item type. Returns `None` for
/// nested arrays and maps, which bind as JSON.
fn pg_array(item_type: ParameterType, items: &[Value]) -> anyhow::Result<Option<PgArray>> {
    fn collect<T>(
        items: &[Value],
        item_type: ParameterType,
        get: impl Fn(&Value) -> Option<T>,
    ) -> anyhow::Result<Vec<T>> {
        items
            .iter()
            .map(|item| {
                get(item).ok_or_else(|| anyhow!("array item {item} is not of type {item_type}"))
            })
            .collect()
    }

    let array = match item_type {
        ParameterType::Integer => PgArray::Integer(collect(items, item_type, Value::as_i64)?),
        ParameterType::Float => PgArray::Float(collect(items, item_type, Value::as_f64)?),
        ParameterType::String => PgArray::Text(collect(items, item_type, |item| {
            item.as_str().map(str::to_string)
        })?),
        ParameterType::Boolean => PgArray::Boolean(collect(items, item_type, Value::as_bool)?),
        ParameterType::Array | ParameterType::Map => return Ok(None),
    };
    Ok(Some(array))
}

fn bind_pg<'q>(
    query: Query<'q, Postgres, PgArguments>,
    param: &SqlParam,
) -> anyhow::Result<Query<'q, Postgres, PgArguments>> {
    let query = match &param.value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match numeric(n)? {
            Numeric::Integer(i) => query.bind(i),
            Numeric::Float(f) => query.bind(f),
        },
        Value::String(s) => query.bind(s.clone()),
        Value::Array(items) => {
            let array = match param.item_type {
                Some(item_type) => pg_array(item_type, items)?,
                None => None,
            };
            match array {
                Some(PgArray::Integer(v)) => query.bind(v),
                Some(PgArray::Float(v)) => query.bind(v),
                Some(PgArray::Text(v)) => query.bind(v),
                Some(PgArray::Boolean(v)) => query.bind(v),
                None => query.bind(sqlx::types::Json(param.value.clone())),
            }
        }
        Value::Object(_) => query.bind(sqlx::types::Json(param.value.clone())),
    };
    Ok(query)
}

fn bind_sqlite<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> anyhow::Result<Query<'q, Sqlite, SqliteArguments<'q>>> {
    let query = match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match numeric(n)? {
            Numeric::Integer(i) => query.bind(i),
            Numeric::Float(f) => query.bind(f),
        },
        Value::String(s) => query.bind(s.clone()),
        Value::Array(_) | Value::Object(_) => query.bind(value.to_string()),
    };
    Ok(query)
}

/// Convert a Postgres row to JSON, trying the common column types in turn.
pub fn pg_row_to_json(row: &PgRow) -> JsonRow {
    let mut obj = Map::new();
    for (idx, col) in row.columns().iter().enumerate() {
        let is_null = row.try_get_raw(idx).map(|raw| raw.is_null()).unwrap_or(true);
        let value = if is_null {
            Value::Null
        } else {
            pg_value(row, idx, col.type_info().name())
        };
        obj.insert(col.name().to_string(), value);
    }
    obj
}

fn pg_value(row: &PgRow, idx: usize, type_name: &str) -> Value {
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        json!(v)
    } else if let Ok(v) = row.try_get::<i32, _>(idx) {
        json!(v)
    } else if let Ok(v) = row.try_get::<i16, _>(idx) {
        json!(v)
    } else if let Ok(v) = row.try_get::<f64, _>(idx) {
        json!(v)
    } else if let Ok(v) = row.try_get::<f32, _>(idx) {
        json!(v)
    } else if let Ok(v) = row.try_get::<bool, _>(idx) {
        json!(v)
    } else if let Ok(v) = row.try_get::<String, _>(idx) {
        json!(v)
    } else if let Ok(v) = row.try_get::<Value, _>(idx) {
        v
    } else if let Ok(v) = row.try_get::<sqlx::types::BigDecimal, _>(idx) {
        let text = v.to_string();
        serde_json::Number::from_str(&text)
            .map(Value::Number)
            .unwrap_or(Value::String(text))
    } else if let Ok(v) = row.try_get::<uuid::Uuid, _>(idx) {
        json!(v.to_string())
    } else if let Ok(v) = row.try_get::<chrono::DateTime<chrono::Utc>, _>(idx) {
        json!(v.to_rfc3339())
    } else if let Ok(v) = row.try_get::<chrono::NaiveDateTime, _>(idx) {
        json!(v.to_string())
    } else if let Ok(v) = row.try_get::<chrono::NaiveDate, _>(idx) {
        json!(v.to_string())
    } else if let Ok(v) = row.try_get::<chrono::NaiveTime, _>(idx) {
        json!(v.to_string())
    } else if let Ok(v) = row.try_get::<Vec<String>, _>(idx) {
        json!(v)
    } else if let Ok(v) = row.try_get::<Vec<i64>, _>(idx) {
        json!(v)
    } else if let Ok(v) = row.try_get::<Vec<i32>, _>(idx) {
        json!(v)
    } else {
        tracing::debug!(column_type = %type_name, "unsupported column type, returning null");
        Value::Null
    }
}

/// Convert a SQLite row to JSON using the value's storage class.
pub fn sqlite_row_to_json(row: &SqliteRow) -> JsonRow {
    let mut obj = Map::new();
    for (idx, col) in row.columns().iter().enumerate() {
        let is_null = row.try_get_raw(idx).map(|raw| raw.is_null()).unwrap_or(true);
        let value = if is_null {
            Value::Null
        } else if let Ok(v) = row.try_get::<i64, _>(idx) {
            json!(v)
        } else if let Ok(v) = row.try_get::<f64, _>(idx) {
            json!(v)
        } else if let Ok(v) = row.try_get::<String, _>(idx) {
            json!(v)
        } else if let Ok(v) = row.try_get::<bool, _>(idx) {
            json!(v)
        } else if let Ok(v) = row.try_get::<Vec<u8>, _>(idx) {
            json!(String::from_utf8_lossy(&v))
        } else {
            let column_type = col.type_info().name();
            tracing::debug!(%column_type, "unsupported column type, returning null");
            Value::Null
        };
        obj.insert(col.name().to_string(), value);
    }
    obj
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_select_literal() {
        let rows = pool().await.fetch_rows("SELECT 1", &[]).await.unwrap();
        assert_eq!(rows_to_value(rows), json!([{"1": 1}]));
    }

    #[tokio::test]
    async fn test_column_order_and_types() {
        let rows = pool()
            .await
            .fetch_rows(
                "SELECT 'x' AS zeta, 2.5 AS alpha, NULL AS mid, ? AS bound",
                &[json!(7).into()],
            )
            .await
            .unwrap();
        let value = rows_to_value(rows);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"[{"zeta":"x","alpha":2.5,"mid":null,"bound":7}]"#
        );
    }

    #[tokio::test]
    async fn test_no_rows_is_null() {
        let pool = pool().await;
        pool.fetch_rows("CREATE TABLE t (id INTEGER)", &[]).await.unwrap();
        let rows = pool.fetch_rows("SELECT id FROM t", &[]).await.unwrap();
        assert_eq!(rows_to_value(rows), Value::Null);
    }

    #[tokio::test]
    async fn test_bind_null_and_bool() {
        let rows = pool()
            .await
            .fetch_rows("SELECT ? IS NULL AS n, ? AS b", &[Value::Null.into(), json!(true).into()])
            .await
            .unwrap();
        assert_eq!(rows[0]["n"], json!(1));
        assert_eq!(rows[0]["b"], json!(1));
    }

    #[tokio::test]
    async fn test_syntax_error() {
        let err = pool().await.fetch_rows("SELEC 1;", &[]).await.unwrap_err();
        assert!(err.to_string().contains("syntax error"), "{err}");
    }

    #[tokio::test]
    async fn test_bind_rejects_unsigned_overflow() {
        let err = pool()
            .await
            .fetch_rows("SELECT ? AS n", &[json!(18446744073709551615u64).into()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not fit in a 64-bit column"), "{err}");
    }

    #[test]
    fn test_numeric_keeps_integers_exact() {
        assert_eq!(numeric(&Number::from(i64::MAX)).unwrap(), Numeric::Integer(i64::MAX));
        assert_eq!(numeric(&Number::from_f64(2.5).unwrap()).unwrap(), Numeric::Float(2.5));
        assert!(numeric(&Number::from(u64::MAX)).is_err());
    }

    #[test]
    fn test_pg_array_follows_item_type() {
        assert_eq!(
            pg_array(ParameterType::Integer, &[json!(1), json!(3)]).unwrap(),
            Some(PgArray::Integer(vec![1, 3]))
        );
        assert_eq!(
            pg_array(ParameterType::Float, &[json!(1.5), json!(2.0)]).unwrap(),
            Some(PgArray::Float(vec![1.5, 2.0]))
        );
        assert_eq!(
            pg_array(ParameterType::String, &[json!("Alice"), json!("Sid")]).unwrap(),
            Some(PgArray::Text(vec!["Alice".to_string(), "Sid".to_string()]))
        );
        assert_eq!(
            pg_array(ParameterType::Boolean, &[json!(true)]).unwrap(),
            Some(PgArray::Boolean(vec![true]))
        );
        assert_eq!(
            pg_array(ParameterType::Integer, &[]).unwrap(),
            Some(PgArray::Integer(vec![]))
        );
        assert_eq!(pg_array(ParameterType::Map, &[json!({"a": 1})]).unwrap(), None);
    }

    #[test]
    fn test_pg_array_rejects_mismatched_item() {
        let err = pg_array(ParameterType::Integer, &[json!(1), json!("x")]).unwrap_err();
        assert_eq!(err.to_string(), "array item \"x\" is not of type integer");
    }

    #[test]
    fn test_declared_param_carries_item_type() {
        let ids = Parameter::array("ids", "", Parameter::integer("id", ""));
        let param = SqlParam::declared(json!([1, 3]), &ids);
        assert_eq!(param.item_type, Some(ParameterType::Integer));
        let name = SqlParam::declared(json!("x"), &Parameter::string("name", ""));
        assert_eq!(name.item_type, None);
    }
}
