use serde::Serialize;
use serde_json::{Map, Value};

/// A resolved `(name, value)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamValue {
    pub name: String,
    pub value: Value,
}

/// Resolved parameters in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParamValues(Vec<ParamValue>);

impl ParamValues {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.0.push(ParamValue {
            name: name.into(),
            value,
        });
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParamValue> {
        self.0.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// Values in declaration order, for positional binding (`$1`, `?`).
    pub fn as_slice(&self) -> Vec<Value> {
        self.0.iter().map(|p| p.value.clone()).collect()
    }

    /// Name to value map, preserving declaration order.
    pub fn as_map(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect()
    }

    /// Like [`as_map`](Self::as_map) with every key prefixed by `$`, for
    /// drivers using named `$name` placeholders.
    pub fn as_map_with_dollar_prefix(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|p| (format!("${}", p.name), p.value.clone()))
            .collect()
    }
}

impl From<Vec<ParamValue>> for ParamValues {
    fn from(values: Vec<ParamValue>) -> Self {
        Self(values)
    }
}

impl FromIterator<ParamValue> for ParamValues {
    fn from_iter<I: IntoIterator<Item = ParamValue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ParamValues {
    type Item = ParamValue;
    type IntoIter = std::vec::IntoIter<ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ParamValues {
    type Item = &'a ParamValue;
    type IntoIter = std::slice::Iter<'a, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ParamValues {
        let mut values = ParamValues::new();
        values.push("b", json!(2));
        values.push("a", json!("x"));
        values
    }

    #[test]
    fn test_as_slice_keeps_order() {
        assert_eq!(sample().as_slice(), vec![json!(2), json!("x")]);
    }

    #[test]
    fn test_as_map_keeps_order() {
        let keys: Vec<_> = sample().as_map().keys().cloned().collect();
        assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_dollar_prefix() {
        let map = sample().as_map_with_dollar_prefix();
        assert_eq!(map.get("$a"), Some(&json!("x")));
        assert!(map.get("a").is_none());
    }

    #[test]
    fn test_get() {
        assert_eq!(sample().get("a"), Some(&json!("x")));
        assert_eq!(sample().get("missing"), None);
    }
}
