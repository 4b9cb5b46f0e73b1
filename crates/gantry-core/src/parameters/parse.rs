use super::{ParamValues, Parameter, ParameterManifest, ParameterType, Parameters, json_type_name};
use crate::auth::ClaimsMap;
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised while validating parameter declarations or caller input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    /// A required parameter was neither supplied nor injected from a claim.
    #[error("parameter \"{0}\" is required")]
    Missing(String),

    /// The supplied value does not have the declared type.
    #[error("parameter \"{name}\" expects type {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: ParameterType,
        actual: &'static str,
    },

    /// An integer that does not fit in a signed 64-bit value.
    #[error("parameter \"{name}\" is out of range for a 64-bit integer: {value}")]
    OutOfRange { name: String, value: String },

    /// The value is not one of the declared `allowedValues`.
    #[error("parameter \"{name}\" must be one of {allowed}, got {value}")]
    NotAllowed {
        name: String,
        allowed: String,
        value: String,
    },

    /// An auth-bound parameter had no claim from a verified auth service.
    #[error("missing or invalid authentication header for parameter \"{0}\"")]
    MissingClaim(String),

    /// The declaration itself is malformed.
    #[error("invalid parameter \"{name}\": {reason}")]
    Invalid { name: String, reason: String },

    /// Two declarations share one name.
    #[error("parameter name \"{0}\" is declared more than once")]
    Duplicate(String),

    /// A template placeholder could not be rendered.
    #[error("unable to resolve template: {0}")]
    Template(String),
}

impl ParamError {
    pub(crate) fn mismatch(name: &str, expected: ParameterType, value: &Value) -> Self {
        ParamError::TypeMismatch {
            name: name.to_string(),
            expected,
            actual: json_type_name(value),
        }
    }

    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        ParamError::Invalid {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Resolves caller input against `params`.
///
/// For each declared parameter, in order: a claim from any bound auth
/// service wins over caller input; otherwise the caller's value (JSON null
/// counts as absent); otherwise the default. Missing required parameters
/// fail, missing optional ones are omitted. Keys that match no declaration
/// are ignored.
///
/// Parameters bound to auth services only ever take their value from a
/// verified claim; caller input for them is ignored.
pub fn parse_params(
    params: &[Parameter],
    data: &Map<String, Value>,
    claims: &ClaimsMap,
) -> Result<ParamValues, ParamError> {
    let mut values = ParamValues::with_capacity(params.len());
    for param in params {
        if !param.auth_services.is_empty() {
            let claim = claim_value(param, claims)
                .ok_or_else(|| ParamError::MissingClaim(param.name.clone()))?;
            values.push(param.name.clone(), param.check_value(claim)?);
            continue;
        }
        match data.get(&param.name) {
            Some(value) if !value.is_null() => {
                values.push(param.name.clone(), param.check_value(value)?);
            }
            _ => {
                if let Some(default) = &param.default {
                    values.push(param.name.clone(), default.clone());
                } else if param.is_required() {
                    return Err(ParamError::Missing(param.name.clone()));
                }
            }
        }
    }
    Ok(values)
}

fn claim_value<'a>(param: &Parameter, claims: &'a ClaimsMap) -> Option<&'a Value> {
    param
        .auth_services
        .iter()
        .find_map(|binding| claims.get(&binding.name)?.get(&binding.field))
}

/// Selects the values of `params` out of an already-parsed map, in
/// declaration order. Omitted optional parameters bind as null so
/// positional placeholders stay aligned.
pub fn get_params(params: &[Parameter], values: &Map<String, Value>) -> ParamValues {
    params
        .iter()
        .map(|param| super::ParamValue {
            name: param.name.clone(),
            value: values.get(&param.name).cloned().unwrap_or(Value::Null),
        })
        .collect()
}

/// Combines statement and template parameters into the full list a tool
/// accepts, rejecting duplicate names, and returns it with its manifest.
pub fn process_parameters(
    template_params: &[Parameter],
    params: &[Parameter],
) -> Result<(Parameters, Vec<ParameterManifest>), ParamError> {
    let mut seen = HashSet::new();
    let mut all = Parameters::new();
    for param in params.iter().chain(template_params) {
        if !seen.insert(param.name.as_str()) {
            return Err(ParamError::Duplicate(param.name.clone()));
        }
        param.validate()?;
        all.push(param.clone());
    }
    let manifest = all.manifest();
    Ok((all, manifest))
}
