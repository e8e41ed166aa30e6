//! Samyama Pattern
//!
//! Query-language independent core for graph-pattern queries over RDF
//! triple stores. Front-ends hand over triple patterns, constraints and
//! prefixes; the core compiles them into an ordered join plan and runs it as
//! a backtracking search against any store implementing [`TripleSource`].
//!
//! # Pipeline
//!
//! - Qname/prefix resolution (`query::resolve`)
//! - Variable binding into a per-query table (`query::binder`)
//! - Join ordering by shared-variable connectivity (`query::executor::planner`)
//! - Lazy backtracking join with constraint filtering (`query::executor`)
//!
//! Languages plug in through the [`EngineRegistry`].
//!
//! ## Example Usage
//!
//! ```rust
//! use samyama_pattern::{EngineConfig, EngineRegistry, PatternTerm, QueryTriple};
//! use samyama_pattern::rdf::{RdfStore, RdfTerm, Triple};
//!
//! let mut store = RdfStore::new();
//! let alice = RdfTerm::iri("http://example.org/alice").unwrap();
//! let name = RdfTerm::iri("http://xmlns.com/foaf/0.1/name").unwrap();
//! store.insert(Triple::from_terms(alice, name, RdfTerm::literal("Alice")).unwrap()).unwrap();
//!
//! let registry = EngineRegistry::with_defaults();
//! let mut query = registry.create_query("triples", EngineConfig::default(), None).unwrap();
//! query
//!     .add_prefix("foaf", "http://xmlns.com/foaf/0.1/")
//!     .add_select("who")
//!     .add_triple(QueryTriple::new(
//!         PatternTerm::var("who"),
//!         PatternTerm::qname("foaf:name"),
//!         PatternTerm::literal("Alice"),
//!     ));
//! query.prepare().unwrap();
//!
//! let results = query.execute(&store).unwrap().into_results().unwrap();
//! assert_eq!(results.len(), 1);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod query;
pub mod rdf;
pub mod registry;

// Re-export main types for convenience
pub use config::{ConfigError, ConfigResult, EngineConfig};

pub use query::{
    AbortHandle, BinaryOp, Diagnostic, DiagnosticHandler, Expression, Locator, OrderingStrategy,
    PatternTerm, Prefix, Query, QueryError, QueryResult, QueryResults, QuerySolution,
    QueryTriple, ResultFormat, Severity, Solutions, TripleCursor, TripleSource, UnaryOp,
};

pub use registry::{EngineFactory, EngineRegistry, QueryLanguage, TriplesLanguage, TRIPLES_ENGINE};

pub use rdf::{RdfStore, RdfTerm, Triple, TriplePattern};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, env!("CARGO_PKG_VERSION"));
    }
}
