//! RDF triple/quad store implementation
//!
//! This module provides an in-memory RDF store with per-position indexing.
//! It is the reference [`TripleSource`] for the query engine.

use super::types::{Quad, RdfObject, RdfPredicate, RdfSubject, Triple, TriplePattern};
use crate::query::executor::matcher::{MatchResult, TripleCursor, TripleSource, VecCursor};
use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

/// RDF store errors
#[derive(Error, Debug)]
pub enum RdfStoreError {
    /// Triple not found
    #[error("Triple not found")]
    TripleNotFound,

    /// Graph not found
    #[error("Graph not found: {0}")]
    GraphNotFound(String),

    /// Duplicate triple
    #[error("Duplicate triple")]
    DuplicateTriple,
}

pub type RdfStoreResult<T> = Result<T, RdfStoreError>;

/// RDF triple store with per-position indices
///
/// Iteration order is insertion order, so repeated queries over an unchanged
/// store see candidates in the same order.
#[derive(Clone, Default)]
pub struct RdfStore {
    /// All triples (primary storage)
    triples: IndexSet<Triple>,

    /// Subject -> triples with that subject
    subject_index: FxHashMap<RdfSubject, IndexSet<Triple>>,

    /// Predicate -> triples with that predicate
    predicate_index: FxHashMap<RdfPredicate, IndexSet<Triple>>,

    /// Object -> triples with that object
    object_index: FxHashMap<RdfObject, IndexSet<Triple>>,

    /// Named graphs (for quad support)
    graphs: FxHashMap<String, IndexSet<Triple>>,
}

impl RdfStore {
    /// Create a new empty RDF store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a triple into the store
    pub fn insert(&mut self, triple: Triple) -> RdfStoreResult<()> {
        if self.triples.contains(&triple) {
            return Err(RdfStoreError::DuplicateTriple);
        }
        self.update_indices_insert(&triple);
        self.triples.insert(triple);
        Ok(())
    }

    /// Insert a quad (triple with named graph)
    pub fn insert_quad(&mut self, quad: Quad) -> RdfStoreResult<()> {
        let triple = quad.as_triple();

        if !self.triples.contains(&triple) {
            self.update_indices_insert(&triple);
            self.triples.insert(triple.clone());
        }

        if let Some(graph) = quad.graph {
            self.graphs
                .entry(graph.as_str().to_string())
                .or_default()
                .insert(triple);
        }

        Ok(())
    }

    /// Remove a triple from the store
    pub fn remove(&mut self, triple: &Triple) -> RdfStoreResult<()> {
        if !self.triples.shift_remove(triple) {
            return Err(RdfStoreError::TripleNotFound);
        }

        self.update_indices_remove(triple);

        for graph_triples in self.graphs.values_mut() {
            graph_triples.shift_remove(triple);
        }

        Ok(())
    }

    /// Check if a triple exists in the store
    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    /// Get the total number of triples
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Clear all triples
    pub fn clear(&mut self) {
        self.triples.clear();
        self.subject_index.clear();
        self.predicate_index.clear();
        self.object_index.clear();
        self.graphs.clear();
    }

    /// Query triples matching a pattern
    ///
    /// Scans the smallest index among the bound positions, falling back to a
    /// full scan when nothing is bound.
    pub fn query(&self, pattern: &TriplePattern) -> Vec<Triple> {
        let lookups = [
            pattern.subject.as_ref().map(|s| self.subject_index.get(s)),
            pattern.predicate.as_ref().map(|p| self.predicate_index.get(p)),
            pattern.object.as_ref().map(|o| self.object_index.get(o)),
        ];

        let mut candidates: Option<&IndexSet<Triple>> = None;
        for lookup in lookups.into_iter().flatten() {
            // A bound position with no index entry means nothing can match
            let Some(set) = lookup else {
                return Vec::new();
            };
            if candidates.map_or(true, |c| set.len() < c.len()) {
                candidates = Some(set);
            }
        }

        candidates
            .unwrap_or(&self.triples)
            .iter()
            .filter(|triple| pattern.matches(triple))
            .cloned()
            .collect()
    }

    /// Get all triples in a named graph
    pub fn get_graph(&self, graph_iri: &str) -> RdfStoreResult<Vec<Triple>> {
        self.graphs
            .get(graph_iri)
            .map(|triples| triples.iter().cloned().collect())
            .ok_or_else(|| RdfStoreError::GraphNotFound(graph_iri.to_string()))
    }

    /// List all named graphs
    pub fn list_graphs(&self) -> Vec<String> {
        self.graphs.keys().cloned().collect()
    }

    /// A view restricted to the union of the given named graphs
    ///
    /// An empty list means the whole store. Unknown graphs contribute nothing.
    pub fn scoped<S: AsRef<str>>(&self, graphs: &[S]) -> GraphScope<'_> {
        GraphScope {
            store: self,
            graphs: graphs
                .iter()
                .filter_map(|g| self.graphs.get(g.as_ref()))
                .collect(),
            whole_store: graphs.is_empty(),
        }
    }

    /// Get an iterator over all triples
    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    fn update_indices_insert(&mut self, triple: &Triple) {
        self.subject_index
            .entry(triple.subject.clone())
            .or_default()
            .insert(triple.clone());
        self.predicate_index
            .entry(triple.predicate.clone())
            .or_default()
            .insert(triple.clone());
        self.object_index
            .entry(triple.object.clone())
            .or_default()
            .insert(triple.clone());
    }

    fn update_indices_remove(&mut self, triple: &Triple) {
        fn remove_from<K: std::hash::Hash + Eq>(
            index: &mut FxHashMap<K, IndexSet<Triple>>,
            key: &K,
            triple: &Triple,
        ) {
            if let Some(set) = index.get_mut(key) {
                set.shift_remove(triple);
                if set.is_empty() {
                    index.remove(key);
                }
            }
        }

        remove_from(&mut self.subject_index, &triple.subject, triple);
        remove_from(&mut self.predicate_index, &triple.predicate, triple);
        remove_from(&mut self.object_index, &triple.object, triple);
    }
}

impl TripleSource for RdfStore {
    fn open<'a>(&'a self, pattern: &TriplePattern) -> MatchResult<Box<dyn TripleCursor + 'a>> {
        let matches = self.query(pattern);
        debug!("Opened cursor for {} with {} candidates", pattern, matches.len());
        Ok(Box::new(VecCursor::new(matches)))
    }
}

/// Store view limited to a set of named graphs
pub struct GraphScope<'a> {
    store: &'a RdfStore,
    graphs: Vec<&'a IndexSet<Triple>>,
    whole_store: bool,
}

impl<'a> GraphScope<'a> {
    /// Whether this scope falls back to the whole store
    pub fn is_whole_store(&self) -> bool {
        self.whole_store
    }
}

impl<'s> TripleSource for GraphScope<'s> {
    fn open<'a>(&'a self, pattern: &TriplePattern) -> MatchResult<Box<dyn TripleCursor + 'a>> {
        if self.whole_store {
            return self.store.open(pattern);
        }
        let mut seen = IndexSet::new();
        for graph in &self.graphs {
            for triple in graph.iter().filter(|t| pattern.matches(t)) {
                seen.insert(triple.clone());
            }
        }
        Ok(Box::new(VecCursor::new(seen.into_iter().collect())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::types::{Literal, NamedNode};

    fn create_test_triple() -> Triple {
        let subject = NamedNode::new("http://example.org/alice").unwrap();
        let predicate = RdfPredicate::new("http://xmlns.com/foaf/0.1/name").unwrap();
        let object = Literal::new_simple_literal("Alice");

        Triple::new(subject.into(), predicate, object.into())
    }

    #[test]
    fn test_insert_and_query() {
        let mut store = RdfStore::new();
        let triple = create_test_triple();

        assert!(store.insert(triple.clone()).is_ok());
        assert_eq!(store.len(), 1);
        assert!(store.contains(&triple));
    }

    #[test]
    fn test_duplicate_insert() {
        let mut store = RdfStore::new();
        let triple = create_test_triple();

        assert!(store.insert(triple.clone()).is_ok());
        assert!(store.insert(triple).is_err());
    }

    #[test]
    fn test_remove() {
        let mut store = RdfStore::new();
        let triple = create_test_triple();

        store.insert(triple.clone()).unwrap();
        store.remove(&triple).unwrap();
        assert_eq!(store.len(), 0);
        assert!(!store.contains(&triple));
        assert!(store.query(&TriplePattern::new(Some(triple.subject.clone()), None, None)).is_empty());
        assert!(matches!(store.remove(&triple), Err(RdfStoreError::TripleNotFound)));
    }

    #[test]
    fn test_triple_pattern_query() {
        let mut store = RdfStore::new();
        let triple = create_test_triple();
        store.insert(triple.clone()).unwrap();

        let pattern = TriplePattern::new(None, None, None);
        assert_eq!(store.query(&pattern).len(), 1);

        let pattern = TriplePattern::new(Some(triple.subject.clone()), None, None);
        assert_eq!(store.query(&pattern).len(), 1);

        let wrong_subject = NamedNode::new("http://example.org/bob").unwrap();
        let pattern = TriplePattern::new(Some(wrong_subject.into()), None, None);
        assert_eq!(store.query(&pattern).len(), 0);
    }

    #[test]
    fn test_query_preserves_insertion_order() {
        let mut store = RdfStore::new();
        let name = RdfPredicate::new("http://xmlns.com/foaf/0.1/name").unwrap();
        for who in ["carol", "alice", "bob"] {
            let subject = NamedNode::new(&format!("http://example.org/{}", who)).unwrap();
            store
                .insert(Triple::new(subject.into(), name.clone(), Literal::new_simple_literal(who).into()))
                .unwrap();
        }

        let pattern = TriplePattern::new(None, Some(name), None);
        let names: Vec<String> = store
            .query(&pattern)
            .into_iter()
            .map(|t| t.object.to_string())
            .collect();
        assert_eq!(names.len(), 3);
        assert!(names[0].contains("carol"));
        assert!(names[2].contains("bob"));
    }

    #[test]
    fn test_named_graphs_and_scope() {
        let mut store = RdfStore::new();
        let triple = create_test_triple();
        let graph = NamedNode::new("http://example.org/graph/social").unwrap();

        store
            .insert_quad(Quad::new(
                triple.subject.clone(),
                triple.predicate.clone(),
                triple.object.clone(),
                Some(graph.clone()),
            ))
            .unwrap();
        store
            .insert(Triple::new(
                NamedNode::new("http://example.org/bob").unwrap().into(),
                triple.predicate.clone(),
                Literal::new_simple_literal("Bob").into(),
            ))
            .unwrap();

        assert_eq!(store.get_graph(graph.as_str()).unwrap().len(), 1);
        assert_eq!(store.list_graphs().len(), 1);

        let all = TriplePattern::default();
        let scoped = store.scoped(&[graph.as_str()]);
        assert!(!scoped.is_whole_store());
        let mut cursor = scoped.open(&all).unwrap();
        assert_eq!(cursor.current(), Some(&triple));
        cursor.advance().unwrap();
        assert!(cursor.is_exhausted());

        let unscoped = store.scoped::<&str>(&[]);
        assert!(unscoped.is_whole_store());
        assert_eq!(store.query(&all).len(), 2);
    }

    #[test]
    fn test_clear() {
        let mut store = RdfStore::new();
        store.insert(create_test_triple()).unwrap();
        store.clear();
        assert!(store.is_empty());
    }
}
