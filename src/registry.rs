//! Query engine registry
//!
//! Front-ends register an [`EngineFactory`] describing their language and its
//! lifecycle hooks. The registry is an explicit value: populate it at startup,
//! share it read-only afterwards, and `clear` it on teardown.

use crate::config::EngineConfig;
use crate::query::error::{QueryError, QueryResult};
use crate::query::Query;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Name of the built-in pattern language
pub const TRIPLES_ENGINE: &str = "triples";

/// Lifecycle hooks a query language plugs into the core
///
/// `init` and `terminate` bracket a query's lifetime. `prepare` compiles it
/// and `execute` runs right before the join starts. The default `prepare`
/// runs the standard compile pipeline.
pub trait QueryLanguage: Send + Sync {
    /// Populate `query` (typically by parsing its query string)
    fn init(&self, _query: &mut Query, _name: &str) -> QueryResult<()> {
        Ok(())
    }

    fn terminate(&self, _query: &mut Query) {}

    fn prepare(&self, query: &mut Query) -> QueryResult<()> {
        query.compile()
    }

    fn execute(&self, _query: &mut Query) -> QueryResult<()> {
        Ok(())
    }
}

/// Pre-parsed pattern queries built through the `Query` API
#[derive(Debug, Default, Clone, Copy)]
pub struct TriplesLanguage;

impl QueryLanguage for TriplesLanguage {}

/// Registration record of one query language
#[derive(Clone)]
pub struct EngineFactory {
    pub name: String,
    pub label: String,
    pub alias: Option<String>,
    pub mime_type: Option<String>,
    pub uri: Option<String>,
    pub language: Arc<dyn QueryLanguage>,
}

impl EngineFactory {
    /// Whether `key` names this factory by name, alias or URI
    pub fn answers_to(&self, key: &str) -> bool {
        self.name == key || self.alias.as_deref() == Some(key) || self.uri.as_deref() == Some(key)
    }
}

impl fmt::Debug for EngineFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineFactory")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("alias", &self.alias)
            .field("mime_type", &self.mime_type)
            .field("uri", &self.uri)
            .finish_non_exhaustive()
    }
}

/// Catalog of registered query languages
#[derive(Debug, Default)]
pub struct EngineRegistry {
    factories: IndexMap<String, Arc<EngineFactory>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `triples` language
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.insert(EngineFactory {
            name: TRIPLES_ENGINE.to_string(),
            label: "Triple patterns".to_string(),
            alias: None,
            mime_type: None,
            uri: Some("http://www.w3.org/1999/02/22-rdf-syntax-ns#Statement".to_string()),
            language: Arc::new(TriplesLanguage),
        });
        registry
    }

    /// Add a factory; `builder` fills in the MIME type and language hooks
    pub fn register<F>(
        &mut self,
        name: &str,
        label: &str,
        alias: Option<&str>,
        uri: Option<&str>,
        builder: F,
    ) -> QueryResult<Arc<EngineFactory>>
    where
        F: FnOnce(&mut EngineFactory),
    {
        if self.factories.contains_key(name) {
            return Err(QueryError::DuplicateName(name.to_string()));
        }

        let mut factory = EngineFactory {
            name: name.to_string(),
            label: label.to_string(),
            alias: alias.map(str::to_string),
            mime_type: None,
            uri: uri.map(str::to_string),
            language: Arc::new(TriplesLanguage),
        };
        builder(&mut factory);
        Ok(self.insert(factory))
    }

    fn insert(&mut self, factory: EngineFactory) -> Arc<EngineFactory> {
        let factory = Arc::new(factory);
        self.factories.insert(factory.name.clone(), Arc::clone(&factory));
        info!("Registered query engine '{}' ({})", factory.name, factory.label);
        factory
    }

    /// Find a factory by name, alias or URI
    pub fn lookup(&self, name_or_uri: &str) -> QueryResult<Arc<EngineFactory>> {
        if let Some(factory) = self.factories.get(name_or_uri) {
            return Ok(Arc::clone(factory));
        }
        self.factories
            .values()
            .find(|f| f.answers_to(name_or_uri))
            .cloned()
            .ok_or_else(|| QueryError::NotFound(name_or_uri.to_string()))
    }

    /// Create a query for the named language
    pub fn create_query(
        &self,
        name_or_uri: &str,
        config: EngineConfig,
        query_string: Option<&str>,
    ) -> QueryResult<Query> {
        Query::new(self.lookup(name_or_uri)?, config, query_string)
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Remove every registration
    pub fn clear(&mut self) {
        self.factories.clear();
    }
}
