//! Variable table
//!
//! Maps variable names to stable [`VarId`] indices. The first
//! `select_count` entries are the user-visible select variables in select
//! order; internal variables follow in discovery order.

use crate::query::error::{QueryError, QueryResult};
use crate::rdf::RdfTerm;
use rustc_hash::FxHashMap;
use std::fmt;

/// Index of a variable in its query's table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A query variable and its current binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub id: VarId,
    /// Appears in the select list
    pub selected: bool,
    /// Set during execution, cleared on backtrack
    pub value: Option<RdfTerm>,
}

/// Canonical per-query variable table
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    variables: Vec<Variable>,
    by_name: FxHashMap<String, VarId>,
    select_count: usize,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new variable
    ///
    /// Select variables must all be declared before the first internal one,
    /// otherwise the select prefix of the table would be broken.
    pub fn declare(&mut self, name: &str, selected: bool) -> QueryResult<VarId> {
        if self.by_name.contains_key(name) {
            return Err(QueryError::DuplicateVariableDeclaration(name.to_string()));
        }
        if selected && self.select_count != self.variables.len() {
            return Err(QueryError::DuplicateVariableDeclaration(format!(
                "{} (select variable declared after internal variables)",
                name
            )));
        }

        let id = VarId(self.variables.len());
        self.variables.push(Variable {
            name: name.to_string(),
            id,
            selected,
            value: None,
        });
        self.by_name.insert(name.to_string(), id);
        if selected {
            self.select_count += 1;
        }
        Ok(id)
    }

    /// Existing id for `name`, or a new internal variable
    pub fn get_or_declare(&mut self, name: &str) -> QueryResult<VarId> {
        match self.by_name.get(name) {
            Some(&id) => Ok(id),
            None => self.declare(name, false),
        }
    }

    pub fn get(&self, name: &str) -> Option<VarId> {
        self.by_name.get(name).copied()
    }

    /// Variable for an id handed out by this table
    ///
    /// # Panics
    ///
    /// Panics if the id came from another table.
    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.index()]
    }

    pub fn name(&self, id: VarId) -> &str {
        &self.variables[id.index()].name
    }

    /// Current binding of a variable
    pub fn value(&self, id: VarId) -> Option<&RdfTerm> {
        self.variables.get(id.index()).and_then(|v| v.value.as_ref())
    }

    /// Ids from another table are ignored
    pub fn bind(&mut self, id: VarId, value: RdfTerm) {
        if let Some(variable) = self.variables.get_mut(id.index()) {
            variable.value = Some(value);
        }
    }

    pub fn unbind(&mut self, id: VarId) {
        if let Some(variable) = self.variables.get_mut(id.index()) {
            variable.value = None;
        }
    }

    /// Clear every binding
    pub fn reset(&mut self) {
        for variable in &mut self.variables {
            variable.value = None;
        }
    }

    /// Total number of variables (N)
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Number of select variables (K)
    pub fn select_count(&self) -> usize {
        self.select_count
    }

    /// The select variables, in select order
    pub fn selected(&self) -> &[Variable] {
        &self.variables[..self.select_count]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_lookup() {
        let mut table = VariableTable::new();
        let x = table.declare("x", true).unwrap();
        let y = table.get_or_declare("y").unwrap();

        assert_eq!(x, VarId(0));
        assert_eq!(y, VarId(1));
        assert_eq!(table.get_or_declare("x").unwrap(), x);
        assert_eq!(table.name(y), "y");
        assert_eq!(table.len(), 2);
        assert_eq!(table.select_count(), 1);
        assert_eq!(table.selected()[0].name, "x");
        assert!(!table.variable(y).selected);
    }

    #[test]
    fn test_duplicate_declaration_is_guarded() {
        let mut table = VariableTable::new();
        table.declare("x", true).unwrap();
        assert_eq!(
            table.declare("x", false),
            Err(QueryError::DuplicateVariableDeclaration("x".to_string()))
        );
    }

    #[test]
    fn test_select_after_internal_rejected() {
        let mut table = VariableTable::new();
        table.declare("a", false).unwrap();
        assert!(matches!(
            table.declare("b", true),
            Err(QueryError::DuplicateVariableDeclaration(_))
        ));
    }

    #[test]
    fn test_bind_unbind_reset() {
        let mut table = VariableTable::new();
        let x = table.declare("x", true).unwrap();
        let term = RdfTerm::literal("Alice");

        table.bind(x, term.clone());
        assert_eq!(table.value(x), Some(&term));

        table.unbind(x);
        assert_eq!(table.value(x), None);

        table.bind(x, term);
        table.reset();
        assert_eq!(table.value(x), None);
    }

    #[test]
    fn test_foreign_id_is_ignored() {
        let mut table = VariableTable::new();
        table.declare("x", true).unwrap();

        table.bind(VarId(5), RdfTerm::literal("stray"));
        table.unbind(VarId(5));
        assert_eq!(table.value(VarId(5)), None);
        assert_eq!(table.value(VarId(0)), None);
    }
}
