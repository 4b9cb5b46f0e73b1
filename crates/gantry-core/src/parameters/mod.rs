//! Typed tool parameters.
//!
//! A [`Parameter`] is declared once in configuration and shared read-only by
//! every invocation of the tool that owns it. Incoming JSON is checked against
//! the declaration by [`parse_params`], which produces [`ParamValues`] in
//! declaration order so positional placeholders bind deterministically.
//!
//! ```yaml
//! parameters:
//!   - name: id
//!     type: integer
//!     description: Row id
//!   - name: email
//!     type: string
//!     description: Caller email
//!     authServices:
//!       - name: my-jwt
//!         field: email
//! ```

mod manifest;
mod parse;
mod template;
mod values;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::ops::Deref;

pub use manifest::{McpParameterSchema, McpToolsSchema, ParameterManifest};
pub use parse::{ParamError, get_params, parse_params, process_parameters};
pub use template::resolve_template_params;
pub use values::{ParamValue, ParamValues};

/// Declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Integer,
    Float,
    Boolean,
    Array,
    Map,
}

impl ParameterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::String => "string",
            ParameterType::Integer => "integer",
            ParameterType::Float => "float",
            ParameterType::Boolean => "boolean",
            ParameterType::Array => "array",
            ParameterType::Map => "map",
        }
    }

    /// Type name used in JSON-schema documents (MCP input schemas).
    pub fn json_schema_type(&self) -> &'static str {
        match self {
            ParameterType::Float => "number",
            ParameterType::Map => "object",
            other => other.as_str(),
        }
    }

    fn is_scalar(&self) -> bool {
        !matches!(self, ParameterType::Array | ParameterType::Map)
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binds a parameter to a claim of a verified auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamAuthService {
    /// Name of the auth service as declared under `authServices`.
    pub name: String,
    /// Claim field whose value is injected into the parameter.
    pub field: String,
}

impl ParamAuthService {
    pub fn new(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
        }
    }
}

/// One named, typed tool input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Parameter {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: ParameterType,

    #[serde(default)]
    pub description: String,

    /// Explicit required flag. When absent the parameter is required unless
    /// it has a default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, alias = "authSources", skip_serializing_if = "Vec::is_empty")]
    pub auth_services: Vec<ParamAuthService>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Value>>,

    /// Item declaration for `array` parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Parameter>>,

    /// Value type for every entry of a `map` parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ParameterType>,
}

impl Parameter {
    pub fn new(
        name: impl Into<String>,
        kind: ParameterType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: None,
            default: None,
            auth_services: Vec::new(),
            allowed_values: None,
            items: None,
            value_type: None,
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParameterType::String, description)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParameterType::Integer, description)
    }

    pub fn float(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParameterType::Float, description)
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParameterType::Boolean, description)
    }

    pub fn array(
        name: impl Into<String>,
        description: impl Into<String>,
        items: Parameter,
    ) -> Self {
        let mut param = Self::new(name, ParameterType::Array, description);
        param.items = Some(Box::new(items));
        param
    }

    pub fn map(
        name: impl Into<String>,
        description: impl Into<String>,
        value_type: Option<ParameterType>,
    ) -> Self {
        let mut param = Self::new(name, ParameterType::Map, description);
        param.value_type = value_type;
        param
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = Some(false);
        self
    }

    pub fn with_auth_services(mut self, services: Vec<ParamAuthService>) -> Self {
        self.auth_services = services;
        self
    }

    pub fn with_allowed_values(mut self, values: Vec<Value>) -> Self {
        self.allowed_values = Some(values);
        self
    }

    /// Whether a caller (or a claim) must supply this parameter.
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(true) && self.default.is_none()
    }

    /// Configuration-time checks on the declaration itself.
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.name.is_empty() {
            return Err(ParamError::invalid("", "parameter name must not be empty"));
        }
        match (self.kind, self.items.as_deref()) {
            (ParameterType::Array, None) => {
                return Err(ParamError::invalid(
                    &self.name,
                    "array parameters must declare `items`",
                ));
            }
            (ParameterType::Array, Some(items)) => {
                if !items.auth_services.is_empty() {
                    return Err(ParamError::invalid(
                        &self.name,
                        "array items cannot declare their own `authServices`",
                    ));
                }
                items.validate()?;
            }
            (_, Some(_)) => {
                return Err(ParamError::invalid(
                    &self.name,
                    "`items` is only valid for array parameters",
                ));
            }
            (_, None) => {}
        }
        if let Some(value_type) = self.value_type {
            if self.kind != ParameterType::Map {
                return Err(ParamError::invalid(
                    &self.name,
                    "`valueType` is only valid for map parameters",
                ));
            }
            if !value_type.is_scalar() {
                return Err(ParamError::invalid(
                    &self.name,
                    "`valueType` must be a scalar type",
                ));
            }
        }
        if let Some(default) = &self.default {
            self.check_value(default)?;
        }
        Ok(())
    }

    /// Type-checks `value` against this declaration and returns the
    /// normalized value (e.g. `3.0` for an integer parameter becomes `3`).
    pub fn check_value(&self, value: &Value) -> Result<Value, ParamError> {
        self.coerce(&self.name, value)
    }

    fn coerce(&self, path: &str, value: &Value) -> Result<Value, ParamError> {
        let coerced = match self.kind {
            ParameterType::Array => {
                let Some(entries) = value.as_array() else {
                    return Err(ParamError::mismatch(path, self.kind, value));
                };
                let Some(item_param) = self.items.as_deref() else {
                    return Err(ParamError::invalid(path, "array parameter has no `items`"));
                };
                let mut out = Vec::with_capacity(entries.len());
                for (idx, entry) in entries.iter().enumerate() {
                    out.push(item_param.coerce(&format!("{path}[{idx}]"), entry)?);
                }
                Value::Array(out)
            }
            ParameterType::Map => {
                let Some(entries) = value.as_object() else {
                    return Err(ParamError::mismatch(path, self.kind, value));
                };
                match self.value_type {
                    None => value.clone(),
                    Some(value_type) => {
                        let mut out = Map::with_capacity(entries.len());
                        for (key, entry) in entries {
                            let entry_path = format!("{path}.{key}");
                            let checked = coerce_scalar(&entry_path, value_type, entry)?;
                            out.insert(key.clone(), checked);
                        }
                        Value::Object(out)
                    }
                }
            }
            scalar => coerce_scalar(path, scalar, value)?,
        };

        if let Some(allowed) = &self.allowed_values {
            if !allowed.contains(&coerced) {
                return Err(ParamError::NotAllowed {
                    name: path.to_string(),
                    allowed: Value::Array(allowed.clone()).to_string(),
                    value: coerced.to_string(),
                });
            }
        }
        Ok(coerced)
    }

    /// Manifest entry exposed by `GET /api/tool/{name}`.
    pub fn manifest(&self) -> ParameterManifest {
        ParameterManifest {
            name: self.name.clone(),
            kind: self.kind.as_str().to_string(),
            required: self.is_required(),
            description: self.description.clone(),
            auth_sources: self.auth_service_names(),
            items: self.items.as_ref().map(|items| Box::new(items.manifest())),
            additional_properties: self.additional_properties(),
        }
    }

    /// JSON-schema fragment for the MCP `inputSchema.properties` entry.
    pub fn mcp_schema(&self) -> McpParameterSchema {
        McpParameterSchema {
            kind: self.kind.json_schema_type().to_string(),
            description: self.description.clone(),
            items: self.items.as_ref().map(|items| Box::new(items.mcp_schema())),
            additional_properties: self.additional_properties(),
            allowed_values: self.allowed_values.clone(),
            default: self.default.clone(),
        }
    }

    pub fn auth_service_names(&self) -> Vec<String> {
        self.auth_services.iter().map(|a| a.name.clone()).collect()
    }

    fn additional_properties(&self) -> Option<Value> {
        if self.kind != ParameterType::Map {
            return None;
        }
        Some(match self.value_type {
            Some(value_type) => serde_json::json!({ "type": value_type.json_schema_type() }),
            None => Value::Bool(true),
        })
    }
}

const I64_MIN_F64: f64 = -9.223372036854775808e18;
const I64_END_F64: f64 = 9.223372036854775808e18;

fn coerce_scalar(path: &str, kind: ParameterType, value: &Value) -> Result<Value, ParamError> {
    match (kind, value) {
        (ParameterType::String, Value::String(_)) | (ParameterType::Boolean, Value::Bool(_)) => {
            Ok(value.clone())
        }
        (ParameterType::Integer, Value::Number(n)) => {
            if n.is_i64() {
                return Ok(value.clone());
            }
            if n.is_u64() {
                return Err(ParamError::OutOfRange {
                    name: path.to_string(),
                    value: n.to_string(),
                });
            }
            match n.as_f64() {
                Some(f) if f.fract() != 0.0 || !f.is_finite() => {
                    Err(ParamError::mismatch(path, kind, value))
                }
                // i64::MAX as f64 rounds up to 2^63, which is already out of range.
                Some(f) if (I64_MIN_F64..I64_END_F64).contains(&f) => Ok(Value::from(f as i64)),
                _ => Err(ParamError::OutOfRange {
                    name: path.to_string(),
                    value: n.to_string(),
                }),
            }
        }
        (ParameterType::Float, Value::Number(n)) => match n.as_f64() {
            Some(f) => Ok(Value::from(f)),
            None => Err(ParamError::mismatch(path, kind, value)),
        },
        _ => Err(ParamError::mismatch(path, kind, value)),
    }
}

/// Name of the JSON type of `value`, used in type-mismatch errors.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// An ordered parameter list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(Vec<Parameter>);

impl Parameters {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, param: Parameter) {
        self.0.push(param);
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.0.iter().find(|p| p.name == name)
    }

    /// Validates every declaration and rejects duplicate names.
    pub fn validate(&self) -> Result<(), ParamError> {
        let mut seen = HashSet::new();
        for param in &self.0 {
            if !seen.insert(param.name.as_str()) {
                return Err(ParamError::Duplicate(param.name.clone()));
            }
            param.validate()?;
        }
        Ok(())
    }

    pub fn manifest(&self) -> Vec<ParameterManifest> {
        self.0.iter().map(Parameter::manifest).collect()
    }

    /// Builds the MCP input schema together with the auth-param metadata
    /// (parameter name to the auth services able to supply it).
    pub fn mcp_manifest(&self) -> (McpToolsSchema, BTreeMap<String, Vec<String>>) {
        let mut schema = McpToolsSchema::default();
        let mut auth_params = BTreeMap::new();
        for param in &self.0 {
            schema.properties.insert(param.name.clone(), param.mcp_schema());
            if param.is_required() {
                schema.required.push(param.name.clone());
            }
            if !param.auth_services.is_empty() {
                auth_params.insert(param.name.clone(), param.auth_service_names());
            }
        }
        (schema, auth_params)
    }

    pub fn into_inner(self) -> Vec<Parameter> {
        self.0
    }
}

impl Deref for Parameters {
    type Target = [Parameter];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Parameter>> for Parameters {
    fn from(params: Vec<Parameter>) -> Self {
        Self(params)
    }
}

impl FromIterator<Parameter> for Parameters {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
