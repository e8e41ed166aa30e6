//! Qname and IRI resolution stage
//!
//! Rewrites every prefixed name and IRI reference in the triple patterns and
//! constraints into a resolved [`RdfTerm`]. Runs before variable binding and
//! triple ordering. Resolved terms are left untouched, so running the stage
//! twice is a no-op.

use crate::query::ast::{Expression, PatternTerm, Prefix, QueryTriple};
use crate::query::error::{QueryError, QueryResult};
use crate::rdf::namespace::{resolve_iri, split_qname, NamespaceManager, PrefixError};
use crate::rdf::{NamedNode, RdfTerm};
use tracing::debug;

/// Expands qnames against the query's prefix declarations
#[derive(Debug, Clone)]
pub struct PrefixResolver {
    namespaces: NamespaceManager,
    base: Option<String>,
}

impl PrefixResolver {
    /// Build from declarations in query order
    ///
    /// With `common_prefixes`, rdf/rdfs/xsd/owl are declared first so the
    /// query's own declarations shadow them.
    pub fn new(prefixes: &[Prefix], common_prefixes: bool, base: Option<&str>) -> Self {
        let mut namespaces = if common_prefixes {
            NamespaceManager::with_common_prefixes()
        } else {
            NamespaceManager::new()
        };
        for prefix in prefixes {
            namespaces.add_prefix(prefix.prefix.clone(), prefix.namespace.clone());
        }
        Self {
            namespaces,
            base: base.map(str::to_string),
        }
    }

    pub fn namespaces(&self) -> &NamespaceManager {
        &self.namespaces
    }

    /// Expand `prefix:local` into a named node
    pub fn expand_qname(&self, qname: &str) -> QueryResult<NamedNode> {
        let (prefix, _) =
            split_qname(qname).ok_or_else(|| QueryError::InvalidIri(qname.to_string()))?;
        let iri = self.namespaces.expand(qname).map_err(|e| match e {
            PrefixError::UnknownPrefix(_) => QueryError::UndeclaredPrefix {
                prefix: prefix.to_string(),
                qname: qname.to_string(),
            },
            PrefixError::InvalidIri(iri) => QueryError::InvalidIri(iri),
        })?;
        NamedNode::new(&iri).map_err(|e| QueryError::InvalidIri(e.to_string()))
    }

    /// Resolve an IRI reference against the base
    pub fn resolve_reference(&self, reference: &str) -> QueryResult<NamedNode> {
        let iri = resolve_iri(self.base.as_deref(), reference)
            .map_err(|e| QueryError::InvalidIri(e.to_string()))?;
        NamedNode::new(&iri).map_err(|e| QueryError::InvalidIri(e.to_string()))
    }

    pub fn resolve_term(&self, term: &mut PatternTerm) -> QueryResult<()> {
        let resolved = match term {
            PatternTerm::Qname(qname) => self.expand_qname(qname)?,
            PatternTerm::Iri(reference) => self.resolve_reference(reference)?,
            _ => return Ok(()),
        };
        *term = PatternTerm::Term(RdfTerm::NamedNode(resolved));
        Ok(())
    }

    pub fn resolve_triples(&self, triples: &mut [QueryTriple]) -> QueryResult<()> {
        for triple in triples.iter_mut() {
            for term in triple.terms_mut() {
                self.resolve_term(term)?;
            }
        }
        debug!("Resolved qnames in {} triple patterns", triples.len());
        Ok(())
    }

    pub fn resolve_expression(&self, expr: &mut Expression) -> QueryResult<()> {
        expr.try_for_each_leaf_mut(&mut |leaf| {
            let resolved = match leaf {
                Expression::Qname(qname) => self.expand_qname(qname)?,
                Expression::Iri(reference) => self.resolve_reference(reference)?,
                _ => return Ok(()),
            };
            *leaf = Expression::Constant(RdfTerm::NamedNode(resolved));
            Ok(())
        })
    }
}
