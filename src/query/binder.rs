//! Variable binding stage
//!
//! Scans the select list, then the triple patterns, then the constraints,
//! giving each distinct variable name the next table index and replacing
//! every named occurrence with its [`VarId`] slot.

use crate::query::ast::{Expression, PatternTerm, QueryTriple};
use crate::query::error::{QueryError, QueryResult};
use crate::query::variables::VariableTable;
use tracing::debug;

/// Result of variable assignment
#[derive(Debug, Clone)]
pub struct Bindings {
    pub table: VariableTable,
    /// Select-list names that appeared more than once
    pub duplicate_selects: Vec<String>,
}

/// Build the variable table and rewrite variable occurrences into slots
pub fn assign_variables(
    selects: &[String],
    select_all: bool,
    triples: &mut [QueryTriple],
    constraints: &mut [Expression],
) -> QueryResult<Bindings> {
    if !select_all && selects.is_empty() && triples.is_empty() {
        return Err(QueryError::NoVariables);
    }

    let mut table = VariableTable::new();
    let mut duplicate_selects = Vec::new();

    if select_all {
        for triple in triples.iter() {
            for term in [&triple.subject, &triple.predicate, &triple.object] {
                if let PatternTerm::Variable(name) = term {
                    if table.get(name).is_none() {
                        table.declare(name, true)?;
                    }
                }
            }
        }
    } else {
        for name in selects {
            if table.get(name).is_some() {
                duplicate_selects.push(name.clone());
            } else {
                table.declare(name, true)?;
            }
        }
    }

    for triple in triples.iter_mut() {
        for term in triple.terms_mut() {
            if let PatternTerm::Variable(name) = term {
                *term = PatternTerm::Slot(table.get_or_declare(name)?);
            }
        }
    }

    for constraint in constraints.iter_mut() {
        constraint.try_for_each_leaf_mut(&mut |leaf| {
            if let Expression::Variable(name) = leaf {
                *leaf = Expression::Slot(table.get_or_declare(name)?);
            }
            Ok(())
        })?;
    }

    debug!(
        "Assigned {} variables ({} selected)",
        table.len(),
        table.select_count()
    );

    Ok(Bindings {
        table,
        duplicate_selects,
    })
}
