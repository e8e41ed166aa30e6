use samyama_pattern::query::executor::{MatchError, MatchResult};
use samyama_pattern::rdf::{RdfStore, RdfTerm, Triple, TriplePattern};
use samyama_pattern::{
    BinaryOp, EngineConfig, EngineRegistry, Expression, PatternTerm, Query, QueryError,
    QueryTriple, TripleCursor, TripleSource,
};
use std::sync::atomic::{AtomicUsize, Ordering};

const EX: &str = "http://example.org/";

fn iri(local: &str) -> RdfTerm {
    RdfTerm::iri(&format!("{}{}", EX, local)).unwrap()
}

fn fact(store: &mut RdfStore, s: &str, p: &str, o: RdfTerm) {
    store.insert(Triple::from_terms(iri(s), iri(p), o).unwrap()).unwrap();
}

fn new_query(config: EngineConfig) -> Query {
    let mut query = EngineRegistry::with_defaults()
        .create_query("triples", config, None)
        .unwrap();
    query.add_prefix("", EX);
    query
}

fn var(name: &str) -> PatternTerm {
    PatternTerm::var(name)
}

fn q(qname: &str) -> PatternTerm {
    PatternTerm::qname(qname)
}

/// Store wrapper that counts cursor opens
struct CountingSource<'s> {
    store: &'s RdfStore,
    opened: AtomicUsize,
}

impl TripleSource for CountingSource<'_> {
    fn open<'a>(&'a self, pattern: &TriplePattern) -> MatchResult<Box<dyn TripleCursor + 'a>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if self.store.is_empty() {
            return Err(MatchError::Store {
                pattern: pattern.to_string(),
                reason: "unexpected access".to_string(),
            });
        }
        self.store.open(pattern)
    }
}

#[test]
fn test_scenario_a_two_pattern_join() {
    let mut store = RdfStore::new();
    fact(&mut store, "p1", "name", RdfTerm::literal("Alice"));
    fact(&mut store, "p1", "knows", iri("p2"));
    fact(&mut store, "p2", "name", RdfTerm::literal("Bob"));
    fact(&mut store, "p2", "knows", iri("p3"));

    let mut query = new_query(EngineConfig::default());
    query
        .add_select("x")
        .add_select("y")
        .add_triple(QueryTriple::new(var("x"), q(":name"), PatternTerm::literal("Alice")))
        .add_triple(QueryTriple::new(var("x"), q(":knows"), var("y")));
    query.prepare().unwrap();

    let results = query.execute(&store).unwrap().into_results().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results.solutions[0].get("x"), Some(&iri("p1")));
    assert_eq!(results.solutions[0].get("y"), Some(&iri("p2")));
}

#[test]
fn test_scenario_b_constraint_only_query() {
    let store = RdfStore::new();

    let mut query = new_query(EngineConfig::default());
    query.set_select_all(true).add_constraint(Expression::boolean(true));
    query.prepare().unwrap();

    let results = query.execute(&store).unwrap().into_results().unwrap();
    assert_eq!(results.len(), 1);
    assert!(results.solutions[0].is_empty());

    let mut query = new_query(EngineConfig::default());
    query.set_select_all(true).add_constraint(Expression::boolean(false));
    query.prepare().unwrap();
    assert!(query.execute(&store).unwrap().into_results().unwrap().is_empty());
}

#[test]
fn test_scenario_c_type_mismatch_is_false() {
    let mut store = RdfStore::new();
    fact(&mut store, "p1", "label", RdfTerm::literal("ten"));
    fact(&mut store, "p2", "label", RdfTerm::literal("eleven"));

    for verbose in [false, true] {
        let config = EngineConfig {
            verbose,
            ..EngineConfig::default()
        };
        let mut query = new_query(config);
        query
            .add_select("x")
            .add_triple(QueryTriple::new(var("s"), q(":label"), var("x")))
            .add_constraint(Expression::binary(BinaryOp::Gt, Expression::var("x"), Expression::integer(5)));
        query.prepare().unwrap();

        let mut solutions = query.execute(&store).unwrap();
        assert!(solutions.next().is_none());
        drop(solutions);
        assert!(!query.is_failed());
        assert!(query.diagnostics().is_empty());
    }
}

#[test]
fn test_scenario_d_undeclared_prefix() {
    let empty = RdfStore::new();
    let source = CountingSource {
        store: &empty,
        opened: AtomicUsize::new(0),
    };

    let mut query = new_query(EngineConfig::default());
    query
        .add_select("x")
        .add_triple(QueryTriple::new(var("x"), q("foaf:name"), var("n")));

    let err = query.prepare().unwrap_err();
    assert_eq!(
        err,
        QueryError::UndeclaredPrefix {
            prefix: "foaf".to_string(),
            qname: "foaf:name".to_string(),
        }
    );
    assert!(query.is_failed());

    assert!(matches!(query.execute(&source), Err(QueryError::QueryNotReady)));
    assert_eq!(source.opened.load(Ordering::SeqCst), 0);
}
