//! Triple ordering planner
//!
//! Turns the unordered conjunction of triple patterns into a join order for
//! the backtracking executor. The plan is a list of indices into the query's
//! pattern array; patterns are never copied.
//!
//! The default `Connectivity` strategy places exact (variable-free) patterns
//! first, then repeatedly picks the pattern sharing the most variables with
//! those already placed, ties going to the earlier pattern. A pattern with no
//! shared variable only starts a new join root once nothing connected is left.

use crate::query::ast::QueryTriple;
use crate::query::variables::VarId;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the planner orders triple patterns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingStrategy {
    /// Exact patterns first, then greedy shared-variable connectivity
    #[default]
    Connectivity,
    /// Keep the order the front-end produced
    Declared,
}

/// Query planner for triple pattern joins
#[derive(Debug, Clone, Default)]
pub struct QueryPlanner {
    strategy: OrderingStrategy,
}

impl QueryPlanner {
    /// Create a new query planner
    pub fn new(strategy: OrderingStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> OrderingStrategy {
        self.strategy
    }

    /// Order `triples`, returning a permutation of their indices
    ///
    /// Expects variables to be bound to slots already.
    pub fn order(&self, triples: &[QueryTriple]) -> Vec<usize> {
        let order = match self.strategy {
            OrderingStrategy::Declared => (0..triples.len()).collect(),
            OrderingStrategy::Connectivity => order_by_connectivity(triples),
        };
        debug!("Triple join order ({:?}): {:?}", self.strategy, order);
        order
    }
}

fn order_by_connectivity(triples: &[QueryTriple]) -> Vec<usize> {
    let slots: Vec<Vec<VarId>> = triples.iter().map(QueryTriple::slots).collect();

    let mut order: Vec<usize> = (0..triples.len()).filter(|&i| slots[i].is_empty()).collect();
    let mut remaining: Vec<usize> = (0..triples.len()).filter(|&i| !slots[i].is_empty()).collect();
    let mut bound: FxHashSet<VarId> = FxHashSet::default();

    while !remaining.is_empty() {
        // `remaining` stays in original order, so the first maximum wins ties
        let mut best = 0;
        let mut best_score = 0;
        for (pos, &i) in remaining.iter().enumerate() {
            let score = slots[i].iter().filter(|v| bound.contains(v)).count();
            if score > best_score {
                best = pos;
                best_score = score;
            }
        }

        // With best_score == 0 nothing is connected: `best` is still 0, the
        // earliest remaining pattern, which becomes a new join root
        let chosen = remaining.remove(best);
        bound.extend(slots[chosen].iter().copied());
        order.push(chosen);
    }

    order
}
