//! Backtracking join execution
//!
//! The executor walks the planned pattern order as a depth-indexed state
//! machine. Depth `i < M` holds an open cursor for the i-th planned pattern;
//! depth `M` is the terminal state where the constraint is checked and a
//! solution is emitted. Solutions are produced lazily through [`Solutions`].

pub mod eval;
pub mod matcher;
pub mod planner;
pub mod record;

pub use eval::{ConstraintEvaluator, EvalError, Value};
pub use matcher::{MatchError, MatchResult, TripleCursor, TripleSource, VecCursor};
pub use planner::{OrderingStrategy, QueryPlanner};
pub use record::{QueryResults, QuerySolution, ResultFormat};

use crate::query::ast::{Expression, PatternTerm, QueryTriple};
use crate::query::error::{QueryError, QueryResult};
use crate::query::variables::{VarId, VariableTable};
use crate::rdf::{RdfObject, RdfPredicate, RdfSubject, RdfTerm, Triple, TriplePattern, TriplePosition};
use std::iter::FusedIterator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Execution state of one active pattern
struct TripleMeta<'a> {
    /// The pattern has no variables
    exact: bool,
    /// Bound-term view handed to the store; `None` when a bound value cannot
    /// occupy its position, so nothing can match
    pattern: Option<TriplePattern>,
    /// Variable this level binds at each position
    binds: [Option<VarId>; 3],
    cursor: Box<dyn TripleCursor + 'a>,
}

impl TripleMeta<'_> {
    /// Bind this level's variables from `triple`; false on a contradiction
    fn unify(&self, table: &mut VariableTable, triple: &Triple) -> bool {
        for position in TriplePosition::ALL {
            let Some(id) = self.binds[position.index()] else {
                continue;
            };
            let value = triple.term(position);
            match table.value(id) {
                // Same variable earlier in this pattern
                Some(existing) if *existing != value => return false,
                Some(_) => {}
                None => table.bind(id, value),
            }
        }
        true
    }

    fn unbind(&self, table: &mut VariableTable) {
        for id in self.binds.iter().flatten() {
            table.unbind(*id);
        }
    }

    fn close(mut self, table: &mut VariableTable) {
        self.unbind(table);
        self.cursor.close();
        match &self.pattern {
            Some(pattern) => debug!("Closed cursor for {} (exact: {})", pattern, self.exact),
            None => debug!("Closed empty cursor"),
        }
    }
}

/// Lazy sequence of solutions for one execution
///
/// Not restartable: once exhausted, aborted or failed it yields `None`.
/// Dropping it closes every cursor still open.
pub struct Solutions<'a> {
    triples: &'a [QueryTriple],
    order: &'a [usize],
    constraint: Option<&'a Expression>,
    table: &'a mut VariableTable,
    source: &'a dyn TripleSource,
    evaluator: ConstraintEvaluator,
    abort: Arc<AtomicBool>,
    /// Indexed by original pattern position
    metas: Vec<Option<TripleMeta<'a>>>,
    depth: usize,
    pending_advance: bool,
    exhausted: bool,
}

impl<'a> Solutions<'a> {
    pub fn new(
        triples: &'a [QueryTriple],
        order: &'a [usize],
        constraint: Option<&'a Expression>,
        table: &'a mut VariableTable,
        source: &'a dyn TripleSource,
        abort: Arc<AtomicBool>,
        verbose: bool,
    ) -> Self {
        table.reset();
        debug!(
            "Starting join over {} patterns, order {:?}",
            order.len(),
            order
        );
        Self {
            triples,
            order,
            constraint,
            table,
            source,
            evaluator: ConstraintEvaluator::new(verbose),
            abort,
            metas: (0..triples.len()).map(|_| None).collect(),
            depth: 0,
            pending_advance: false,
            exhausted: false,
        }
    }

    /// Select variable names, in select order
    pub fn variables(&self) -> Vec<String> {
        self.table.selected().iter().map(|v| v.name.clone()).collect()
    }

    /// Drain the remaining solutions
    pub fn into_results(mut self) -> QueryResult<QueryResults> {
        let mut results = QueryResults::new(self.variables());
        for solution in self.by_ref() {
            results.solutions.push(solution?);
        }
        Ok(results)
    }

    fn step(&mut self) -> QueryResult<Option<QuerySolution>> {
        let m = self.order.len();
        loop {
            if self.exhausted {
                return Ok(None);
            }
            if self.abort.load(Ordering::Acquire) {
                debug!("Execution aborted at depth {}", self.depth);
                return Err(QueryError::Aborted);
            }

            if self.depth == m {
                let accepted = match self.constraint {
                    Some(constraint) => self.evaluator.matches(constraint, self.table),
                    None => true,
                };
                let solution = accepted.then(|| self.snapshot());
                if m == 0 {
                    self.exhausted = true;
                } else {
                    self.depth = m - 1;
                    self.pending_advance = true;
                }
                if solution.is_some() {
                    return Ok(solution);
                }
                continue;
            }

            let index = self.order[self.depth];
            let opened = if self.metas[index].is_none() {
                let meta = self.open(index)?;
                self.metas[index] = Some(meta);
                true
            } else {
                false
            };

            let table = &mut *self.table;
            let Some(meta) = self.metas[index].as_mut() else {
                continue;
            };
            if !opened && self.pending_advance {
                meta.unbind(table);
                meta.cursor.advance()?;
            }
            self.pending_advance = false;

            match meta.cursor.current().cloned() {
                Some(triple) => {
                    if meta.unify(table, &triple) {
                        self.depth += 1;
                    } else {
                        meta.unbind(table);
                        self.pending_advance = true;
                    }
                }
                None => {
                    if let Some(meta) = self.metas[index].take() {
                        meta.close(table);
                    }
                    if self.depth == 0 {
                        self.exhausted = true;
                        return Ok(None);
                    }
                    self.depth -= 1;
                    self.pending_advance = true;
                }
            }
        }
    }

    /// Build the bound-term view of a pattern and open a cursor on it
    fn open(&self, index: usize) -> QueryResult<TripleMeta<'a>> {
        let triple = &self.triples[index];
        let mut binds = [None; 3];
        let mut terms: [Option<RdfTerm>; 3] = [None, None, None];

        for position in TriplePosition::ALL {
            terms[position.index()] = match triple.term(position) {
                PatternTerm::Term(term) => Some(term.clone()),
                PatternTerm::Slot(id) => match self.table.value(*id) {
                    Some(value) => Some(value.clone()),
                    None => {
                        binds[position.index()] = Some(*id);
                        None
                    }
                },
                // Unresolved names never reach a prepared query
                _ => return Err(QueryError::QueryNotReady),
            };
        }

        let [subject, predicate, object] = terms;
        let subject = subject.map(RdfSubject::try_from).transpose();
        let predicate = predicate.map(RdfPredicate::try_from).transpose();
        let pattern = match (subject, predicate) {
            (Ok(subject), Ok(predicate)) => Some(TriplePattern::new(
                subject,
                predicate,
                object.map(RdfObject::from),
            )),
            _ => None,
        };

        let source = self.source;
        let cursor = match &pattern {
            Some(pattern) => source.open(pattern)?,
            None => Box::new(VecCursor::new(Vec::new())) as Box<dyn TripleCursor + 'a>,
        };

        debug!("Opened cursor for pattern {} at depth {}", triple, self.depth);
        Ok(TripleMeta {
            exact: triple.is_exact(),
            pattern,
            binds,
            cursor,
        })
    }

    fn snapshot(&self) -> QuerySolution {
        let mut solution = QuerySolution::new();
        for variable in self.table.selected() {
            solution.push(variable.name.clone(), variable.value.clone());
        }
        solution
    }

    /// Close every open cursor and clear bindings
    fn finish(&mut self) {
        for meta in self.metas.iter_mut().filter_map(Option::take) {
            meta.close(self.table);
        }
        self.table.reset();
        self.exhausted = true;
    }
}

impl Iterator for Solutions<'_> {
    type Item = QueryResult<QuerySolution>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            self.finish();
            return None;
        }
        match self.step() {
            Ok(Some(solution)) => Some(Ok(solution)),
            Ok(None) => {
                self.finish();
                None
            }
            Err(e) => {
                if let QueryError::StoreMatchFailure(ref failure) = e {
                    warn!("Store failure during execution: {}", failure);
                }
                self.finish();
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for Solutions<'_> {}

impl Drop for Solutions<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::BinaryOp;
    use crate::rdf::{Literal, RdfStore};

    const EX: &str = "http://example.org/";

    fn iri(local: &str) -> RdfTerm {
        RdfTerm::iri(&format!("{}{}", EX, local)).unwrap()
    }

    fn store() -> RdfStore {
        let mut store = RdfStore::new();
        let facts = [
            ("p1", "name", RdfTerm::literal("Alice")),
            ("p1", "knows", iri("p2")),
            ("p2", "name", RdfTerm::literal("Bob")),
            ("p2", "knows", iri("p3")),
            ("p3", "name", RdfTerm::literal("Carol")),
            ("p1", "age", RdfTerm::literal(Literal::from(30i64))),
            ("p2", "age", RdfTerm::literal(Literal::from(4i64))),
        ];
        for (s, p, o) in facts {
            store.insert(Triple::from_terms(iri(s), iri(p), o).unwrap()).unwrap();
        }
        store
    }

    fn slot(id: usize) -> PatternTerm {
        PatternTerm::Slot(VarId(id))
    }

    fn table(names: &[&str]) -> VariableTable {
        let mut table = VariableTable::new();
        for name in names {
            table.declare(name, true).unwrap();
        }
        table
    }

    #[test]
    fn test_two_pattern_join() {
        let store = store();
        let triples = vec![
            QueryTriple::new(slot(0), iri("name"), RdfTerm::literal("Alice")),
            QueryTriple::new(slot(0), iri("knows"), slot(1)),
        ];
        let mut table = table(&["x", "y"]);
        let abort = Arc::new(AtomicBool::new(false));

        let results = Solutions::new(&triples, &[0, 1], None, &mut table, &store, abort, false)
            .into_results()
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results.solutions[0].get("x"), Some(&iri("p1")));
        assert_eq!(results.solutions[0].get("y"), Some(&iri("p2")));
        // Bindings are cleared afterwards
        assert_eq!(table.value(VarId(0)), None);
    }

    #[test]
    fn test_chain_and_constraint() {
        let store = store();
        // ?a knows ?b . ?b age ?n  with ?n > 10 matches nobody; ?n < 10 matches p2
        let triples = vec![
            QueryTriple::new(slot(0), iri("knows"), slot(1)),
            QueryTriple::new(slot(1), iri("age"), slot(2)),
        ];
        let under_ten = Expression::binary(BinaryOp::Lt, Expression::Slot(VarId(2)), Expression::integer(10));
        let mut table = table(&["a", "b", "n"]);
        let abort = Arc::new(AtomicBool::new(false));

        let results = Solutions::new(&triples, &[0, 1], Some(&under_ten), &mut table, &store, abort, false)
            .into_results()
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results.solutions[0].get("a"), Some(&iri("p1")));
        assert_eq!(results.solutions[0].get("b"), Some(&iri("p2")));
    }

    #[test]
    fn test_repeated_variable_in_one_pattern() {
        let mut store = store();
        store
            .insert(Triple::from_terms(iri("p3"), iri("knows"), iri("p3")).unwrap())
            .unwrap();
        let triples = vec![QueryTriple::new(slot(0), iri("knows"), slot(0))];
        let mut table = table(&["x"]);
        let abort = Arc::new(AtomicBool::new(false));

        let results = Solutions::new(&triples, &[0], None, &mut table, &store, abort, false)
            .into_results()
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results.solutions[0].get("x"), Some(&iri("p3")));
    }

    #[test]
    fn test_literal_bound_into_subject_matches_nothing() {
        let store = store();
        // ?x name ?n . ?n knows ?y : ?n is a literal, cannot be a subject
        let triples = vec![
            QueryTriple::new(slot(0), iri("name"), slot(1)),
            QueryTriple::new(slot(1), iri("knows"), slot(2)),
        ];
        let mut table = table(&["x", "n", "y"]);
        let abort = Arc::new(AtomicBool::new(false));

        let mut solutions = Solutions::new(&triples, &[0, 1], None, &mut table, &store, abort, false);
        assert!(solutions.next().is_none());
        assert!(solutions.next().is_none());
    }

    #[test]
    fn test_empty_plan_yields_one_solution() {
        let store = RdfStore::new();
        let mut table = VariableTable::new();
        let abort = Arc::new(AtomicBool::new(false));

        let mut solutions = Solutions::new(&[], &[], None, &mut table, &store, abort, false);
        let first = solutions.next().unwrap().unwrap();
        assert!(first.is_empty());
        assert!(solutions.next().is_none());
    }

    #[test]
    fn test_abort_flag_stops_execution() {
        let store = store();
        let triples = vec![QueryTriple::new(slot(0), iri("name"), slot(1))];
        let mut table = table(&["x", "n"]);
        let abort = Arc::new(AtomicBool::new(false));

        let mut solutions = Solutions::new(&triples, &[0], None, &mut table, &store, Arc::clone(&abort), false);
        assert!(solutions.next().unwrap().is_ok());
        abort.store(true, Ordering::Release);
        assert_eq!(solutions.next(), Some(Err(QueryError::Aborted)));
        assert!(solutions.next().is_none());
    }

    #[test]
    fn test_unsatisfiable_exact_pattern() {
        let store = store();
        let triples = vec![
            QueryTriple::new(iri("p3"), iri("knows"), iri("p1")),
            QueryTriple::new(slot(0), iri("name"), slot(1)),
        ];
        let mut table = table(&["x", "n"]);
        let abort = Arc::new(AtomicBool::new(false));

        let results = Solutions::new(&triples, &[0, 1], None, &mut table, &store, abort, false)
            .into_results()
            .unwrap();
        assert!(results.is_empty());
        assert_eq!(results.variables, vec!["x".to_string(), "n".to_string()]);
    }
}
