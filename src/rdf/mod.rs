//! RDF data model and reference triple store
//!
//! This module provides:
//! - RDF terms and triples (wrappers over `oxrdf`)
//! - Prefix declarations and qname expansion
//! - An in-memory, indexed triple store with named graphs that answers
//!   triple patterns for the join engine
//!
//! # Example
//!
//! ```rust
//! use samyama_pattern::rdf::{RdfStore, Triple, NamedNode, Literal, RdfPredicate, TriplePattern};
//!
//! let mut store = RdfStore::new();
//!
//! let subject = NamedNode::new("http://example.org/alice").unwrap();
//! let predicate = RdfPredicate::new("http://xmlns.com/foaf/0.1/name").unwrap();
//! let object = Literal::new_simple_literal("Alice");
//!
//! store.insert(Triple::new(subject.clone().into(), predicate, object.into())).unwrap();
//!
//! let pattern = TriplePattern::new(Some(subject.into()), None, None);
//! assert_eq!(store.query(&pattern).len(), 1);
//! ```

pub mod namespace;
mod store;
mod types;

pub use types::{
    BlankNode, Literal, NamedNode, Quad, RdfError, RdfObject, RdfPredicate, RdfResult,
    RdfSubject, RdfTerm, Triple, TriplePattern, TriplePosition,
};

pub use store::{GraphScope, RdfStore, RdfStoreError, RdfStoreResult};

pub use namespace::{Namespace, NamespaceManager, PrefixError, PrefixResult};
