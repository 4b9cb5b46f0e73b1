use crate::error::ConfigError;
use regex::Regex;
use std::sync::LazyLock;

static ENV_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

/// Replaces every `${NAME}` in `text` with the value of environment variable
/// `NAME`. An unset variable is an error.
pub fn substitute_env(text: &str) -> Result<String, ConfigError> {
    substitute_with(text, |name| std::env::var(name).ok())
}

pub(crate) fn substitute_with<F>(text: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in ENV_REFERENCE.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = lookup(name.as_str())
            .ok_or_else(|| ConfigError::MissingEnvVar(name.as_str().to_string()))?;
        out.push_str(&text[last..whole.start()]);
        out.push_str(&value);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "DB_USER" => Some("alice".into()),
            "DB_PASS" => Some("s3cret".into()),
            _ => None,
        }
    }

    #[test]
    fn test_substitutes_all_references() {
        let out = substitute_with("user: ${DB_USER}\npassword: ${DB_PASS}\n", lookup).unwrap();
        assert_eq!(out, "user: alice\npassword: s3cret\n");
    }

    #[test]
    fn test_plain_dollar_untouched() {
        let out = substitute_with("statement: SELECT $1", lookup).unwrap();
        assert_eq!(out, "statement: SELECT $1");
    }

    #[test]
    fn test_unset_variable() {
        let err = substitute_with("host: ${DB_HOST}", lookup).unwrap_err();
        assert_eq!(
            err.to_string(),
            "environment variable \"DB_HOST\" referenced in configuration is not set"
        );
    }
}
