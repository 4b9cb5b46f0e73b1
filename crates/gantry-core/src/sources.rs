//! Sources: live connections to one backend.
//!
//! Configuration is two-phase. A kind's factory decodes YAML into a
//! [`SourceConfig`], then [`SourceConfig::initialize`] dials the backend and
//! yields a [`Source`].
//!
//! Tools never see a concrete source type. A source advertises capabilities
//! (typically a cloneable handle such as a connection pool) through
//! [`Source::capability`], and a tool asks for the handle type it needs with
//! [`compatible_source`]. Any source exposing the same handle type is
//! therefore usable by the tool without either side knowing the other.

use crate::error::ConfigError;
use async_trait::async_trait;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Decoded, kind-specific source configuration.
#[async_trait]
pub trait SourceConfig: Send + Sync + fmt::Debug {
    fn kind(&self) -> &str;

    fn name(&self) -> &str;

    /// Establishes the connection. Errors are reported with the source name
    /// by the caller and never retried here.
    async fn initialize(&self) -> anyhow::Result<Arc<dyn Source>>;
}

/// A live backend connection context.
#[async_trait]
pub trait Source: Send + Sync {
    fn kind(&self) -> &str;

    fn name(&self) -> &str;

    /// Returns the capability identified by `id`, if provided.
    fn capability(&self, id: TypeId) -> Option<&(dyn Any + Send + Sync)>;

    /// Releases backend resources at shutdown.
    async fn close(&self) {}
}

impl dyn Source {
    /// Typed view of [`Source::capability`].
    pub fn capability_of<C: Any + Send + Sync>(&self) -> Option<&C> {
        self.capability(TypeId::of::<C>())?.downcast_ref::<C>()
    }
}

impl fmt::Debug for dyn Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}

/// Initialized sources keyed by name.
pub type SourceMap = HashMap<String, Arc<dyn Source>>;

/// Looks up `source_name` and extracts the capability `C` a tool of
/// `tool_kind` needs.
///
/// Fails if the source is not configured, or if it does not provide `C`; the
/// latter error lists `compatible_kinds` so the operator knows what to use.
pub fn compatible_source<C: Any + Send + Sync + Clone>(
    sources: &SourceMap,
    source_name: &str,
    tool_kind: &str,
    compatible_kinds: &[&str],
) -> Result<C, ConfigError> {
    let source = sources
        .get(source_name)
        .ok_or_else(|| ConfigError::SourceNotFound(source_name.to_string()))?;
    source
        .capability_of::<C>()
        .cloned()
        .ok_or_else(|| ConfigError::IncompatibleSource {
            tool_kind: tool_kind.to_string(),
            compatible: compatible_kinds.iter().map(|k| k.to_string()).collect(),
        })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Handle exposed by [`MockSource`].
    #[derive(Debug, Clone, PartialEq)]
    pub struct MockHandle(pub String);

    pub struct MockSource {
        pub name: String,
        pub handle: MockHandle,
    }

    impl MockSource {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                handle: MockHandle(format!("handle-{name}")),
            }
        }
    }

    #[async_trait]
    impl Source for MockSource {
        fn kind(&self) -> &str {
            "mock"
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn capability(&self, id: TypeId) -> Option<&(dyn Any + Send + Sync)> {
            (id == TypeId::of::<MockHandle>()).then_some(&self.handle as &(dyn Any + Send + Sync))
        }
    }

    /// A source with no capabilities at all.
    pub struct MockIncompatibleSource;

    #[async_trait]
    impl Source for MockIncompatibleSource {
        fn kind(&self) -> &str {
            "mock-incompatible"
        }

        fn name(&self) -> &str {
            "incompatible"
        }

        fn capability(&self, _id: TypeId) -> Option<&(dyn Any + Send + Sync)> {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn sources() -> SourceMap {
        let mut map = SourceMap::new();
        map.insert("db".into(), Arc::new(MockSource::new("db")) as Arc<dyn Source>);
        map.insert(
            "other".into(),
            Arc::new(MockIncompatibleSource) as Arc<dyn Source>,
        );
        map
    }

    #[test]
    fn test_compatible_source_found() {
        let handle: MockHandle =
            compatible_source(&sources(), "db", "mock-sql", &["mock"]).unwrap();
        assert_eq!(handle, MockHandle("handle-db".into()));
    }

    #[test]
    fn test_missing_source() {
        let err = compatible_source::<MockHandle>(&sources(), "nope", "mock-sql", &["mock"])
            .unwrap_err();
        assert_eq!(err.to_string(), "no source named \"nope\" configured");
    }

    #[test]
    fn test_incompatible_source_names_kinds() {
        let kinds = ["mock", "mock2"];
        let err = compatible_source::<MockHandle>(&sources(), "other", "mock-sql", &kinds)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("mock-sql"));
        assert!(msg.contains("[\"mock\", \"mock2\"]"));
    }
}
