use super::{ParamError, Parameter};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*(?:(?P<func>array)\s+)?\.(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s*\}\}")
        .expect("valid regex")
});

/// Renders `{{.name}}` and `{{array .name}}` placeholders in `statement`
/// using the values of `template_params`.
///
/// Values are substituted verbatim into the statement text. Only declare
/// template parameters for identifiers (table or column names) and keep data
/// values in ordinary bound parameters.
pub fn resolve_template_params(
    template_params: &[Parameter],
    statement: &str,
    values: &Map<String, Value>,
) -> Result<String, ParamError> {
    if template_params.is_empty() {
        return Ok(statement.to_string());
    }

    let mut out = String::with_capacity(statement.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(statement) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.name("name")) else {
            continue;
        };
        let name = name.as_str();
        if !template_params.iter().any(|p| p.name == name) {
            return Err(ParamError::Template(format!(
                "statement references undeclared template parameter \"{name}\""
            )));
        }
        let value = values
            .get(name)
            .filter(|v| !v.is_null())
            .ok_or_else(|| ParamError::Missing(name.to_string()))?;

        out.push_str(&statement[last..whole.start()]);
        if caps.name("func").is_some() {
            out.push_str(&render_array(name, value)?);
        } else {
            out.push_str(&render_plain(name, value)?);
        }
        last = whole.end();
    }
    out.push_str(&statement[last..]);
    Ok(out)
}

/// `{{array .x}}`: items JSON-encoded and joined with `, `.
fn render_array(name: &str, value: &Value) -> Result<String, ParamError> {
    let Value::Array(items) = value else {
        return Err(ParamError::Template(format!(
            "\"array\" expects an array value for \"{name}\""
        )));
    };
    let rendered: Vec<String> = items.iter().map(Value::to_string).collect();
    Ok(rendered.join(", "))
}

fn render_plain(name: &str, value: &Value) -> Result<String, ParamError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Array(items) => items
            .iter()
            .map(|item| render_plain(name, item))
            .collect::<Result<Vec<_>, _>>()
            .map(|parts| parts.join(", ")),
        Value::Null | Value::Object(_) => Err(ParamError::Template(format!(
            "cannot render value of \"{name}\" into the statement"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_plain_substitution() {
        let params = vec![Parameter::string("tableName", "")];
        let out = resolve_template_params(
            &params,
            "SELECT * FROM {{.tableName}} WHERE id = $1",
            &values(json!({"tableName": "users"})),
        )
        .unwrap();
        assert_eq!(out, "SELECT * FROM users WHERE id = $1");
    }

    #[test]
    fn test_array_helper_quotes_items() {
        let params = vec![Parameter::array("names", "", Parameter::string("n", ""))];
        let out = resolve_template_params(
            &params,
            "SELECT * FROM t WHERE name IN ({{array .names}})",
            &values(json!({"names": ["a", "b"]})),
        )
        .unwrap();
        assert_eq!(out, r#"SELECT * FROM t WHERE name IN ("a", "b")"#);
    }

    #[test]
    fn test_plain_array_joins_raw() {
        let params = vec![Parameter::array("cols", "", Parameter::string("c", ""))];
        let out = resolve_template_params(
            &params,
            "SELECT {{.cols}} FROM t",
            &values(json!({"cols": ["id", "name"]})),
        )
        .unwrap();
        assert_eq!(out, "SELECT id, name FROM t");
    }

    #[test]
    fn test_unknown_placeholder() {
        let params = vec![Parameter::string("tableName", "")];
        let err = resolve_template_params(
            &params,
            "SELECT * FROM {{.other}}",
            &values(json!({"tableName": "users"})),
        )
        .unwrap_err();
        assert!(matches!(err, ParamError::Template(_)));
    }

    #[test]
    fn test_missing_value() {
        let params = vec![Parameter::string("tableName", "")];
        let err =
            resolve_template_params(&params, "SELECT * FROM {{.tableName}}", &Map::new())
                .unwrap_err();
        assert_eq!(err, ParamError::Missing("tableName".into()));
    }

    #[test]
    fn test_no_template_params_is_identity() {
        let out = resolve_template_params(&[], "SELECT '{{.x}}'", &Map::new()).unwrap();
        assert_eq!(out, "SELECT '{{.x}}'");
    }
}
