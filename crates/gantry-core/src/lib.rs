//! Core of the gantry tool gateway.
//!
//! Sources, tools, auth services and prompts are registered by `kind` in
//! [`registry::Registries`], decoded from YAML by [`config`], initialized by
//! [`resources::initialize_resources`] and served through a
//! [`resources::ResourceManager`]. The per-call pipeline (authorize, parse
//! parameters, invoke) lives in [`lifecycle`].

pub mod auth;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod parameters;
pub mod prompts;
pub mod registry;
pub mod resources;
pub mod sources;
pub mod tools;
pub mod toolsets;

pub use auth::{
    AccessToken, AuthError, AuthService, AuthServiceConfig, CallerIdentity, Claims, ClaimsMap,
};
pub use config::{RawConfig, ResourceConfigs};
pub use error::{ConfigError, ErrorCategory, ToolError};
pub use lifecycle::{InvokeError, invoke_tool};
pub use parameters::{ParamError, ParamValues, Parameter, ParameterType, Parameters};
pub use registry::{KindRegistry, Registries};
pub use resources::{ResourceManager, ResourceSet, initialize_resources};
pub use sources::{Source, SourceConfig, SourceMap, compatible_source};
pub use tools::{Manifest, McpManifest, Tool, ToolAnnotations, ToolConfig, ToolMap};
pub use toolsets::{Toolset, ToolsetConfig};

/// Version reported in manifests and the MCP `initialize` response.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
