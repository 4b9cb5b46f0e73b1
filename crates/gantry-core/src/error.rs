//! Error types for gantry-core.

use crate::parameters::ParamError;
use std::path::PathBuf;
use thiserror::Error;

/// Startup-fatal configuration errors.
///
/// Every variant names the offending resource so the operator can find it in
/// the YAML documents.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A factory was registered twice under one kind.
    #[error("{family} kind \"{kind}\" is already registered")]
    DuplicateKind { family: &'static str, kind: String },

    /// No factory is registered for the kind.
    #[error("unknown {what} kind \"{kind}\" for \"{name}\"")]
    UnknownKind {
        what: &'static str,
        name: String,
        kind: String,
    },

    /// The entry has no `kind` key.
    #[error("missing 'kind' field for {what} \"{name}\"")]
    MissingKind { what: &'static str, name: String },

    /// The kind-specific config could not be decoded.
    #[error("unable to parse {what} \"{name}\" as kind \"{kind}\": {source}")]
    Decode {
        what: &'static str,
        name: String,
        kind: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A tool references a source that is not configured.
    #[error("no source named \"{0}\" configured")]
    SourceNotFound(String),

    /// The referenced source lacks the capability the tool needs.
    #[error("invalid source for \"{tool_kind}\" tool: source kind must be one of {compatible:?}")]
    IncompatibleSource {
        tool_kind: String,
        compatible: Vec<String>,
    },

    /// A resource name is defined more than once.
    #[error("resource type '{what}' has multiple entries with the same name \"{name}\"")]
    DuplicateName { what: &'static str, name: String },

    /// A toolset or promptset lists an unknown member.
    #[error("{what} \"{name}\" references unknown {target} \"{reference}\"")]
    UnknownReference {
        what: &'static str,
        name: String,
        target: &'static str,
        reference: String,
    },

    /// A `${VAR}` reference names an unset environment variable.
    #[error("environment variable \"{0}\" referenced in configuration is not set")]
    MissingEnvVar(String),

    /// A parameter declaration is invalid.
    #[error("invalid parameters for {what} \"{name}\": {source}")]
    Parameter {
        what: &'static str,
        name: String,
        #[source]
        source: ParamError,
    },

    /// Semantically invalid configuration.
    #[error("invalid {what} \"{name}\": {reason}")]
    Invalid {
        what: &'static str,
        name: String,
        reason: String,
    },

    /// Connection setup or credential resolution failed.
    #[error("unable to initialize {what} \"{name}\": {source:#}")]
    Initialize {
        what: &'static str,
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// A config file could not be read.
    #[error("unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A config document is not valid YAML.
    #[error("unable to parse {origin}: {source}")]
    Yaml {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Who can act on an invocation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The agent can correct its call (bad parameters, failing query).
    Agent,
    /// A server-side or authorization problem the agent cannot fix.
    Server,
}

/// Errors produced while invoking a tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Caller input did not satisfy the parameter schema.
    #[error(transparent)]
    InvalidParams(#[from] ParamError),

    /// Credentials were missing or rejected.
    #[error("{0}")]
    Unauthorized(String),

    /// The backend operation failed.
    #[error("{message}: {source:#}")]
    Execution {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ToolError {
    pub fn execution(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        ToolError::Execution {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ToolError::InvalidParams(_) | ToolError::Execution { .. } => ErrorCategory::Agent,
            ToolError::Unauthorized(_) | ToolError::Internal(_) => ErrorCategory::Server,
        }
    }

    /// HTTP status code for this error on the REST surface.
    pub fn status_code(&self) -> u16 {
        match self {
            ToolError::InvalidParams(_) => 400,
            ToolError::Unauthorized(_) => 401,
            ToolError::Execution { .. } | ToolError::Internal(_) => 500,
        }
    }
}
