//! RDF namespace and prefix management
//!
//! This module handles namespace prefixes for compact IRI notation and
//! resolution of relative IRI references against a base.

use oxiri::Iri;
use thiserror::Error;

/// Prefix errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrefixError {
    /// Unknown prefix
    #[error("Unknown prefix: {0}")]
    UnknownPrefix(String),

    /// Invalid IRI
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),
}

pub type PrefixResult<T> = Result<T, PrefixError>;

/// Namespace (prefix → IRI mapping)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// Prefix
    pub prefix: String,
    /// IRI
    pub iri: String,
}

impl Namespace {
    /// Create a new namespace
    pub fn new(prefix: impl Into<String>, iri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            iri: iri.into(),
        }
    }
}

/// Well-known namespaces pre-declared by [`NamespaceManager::with_common_prefixes`]
pub const COMMON_PREFIXES: [(&str, &str); 4] = [
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
];

/// Ordered stack of prefix declarations
///
/// Declarations are kept in insertion order. Looking up a prefix returns the
/// most recent declaration of it, so a later declaration shadows an earlier
/// one without removing it.
#[derive(Debug, Clone, Default)]
pub struct NamespaceManager {
    declarations: Vec<Namespace>,
}

impl NamespaceManager {
    /// Create an empty namespace manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a namespace manager with the rdf/rdfs/xsd/owl prefixes declared
    pub fn with_common_prefixes() -> Self {
        let mut mgr = Self::new();
        for (prefix, iri) in COMMON_PREFIXES {
            mgr.add_prefix(prefix, iri);
        }
        mgr
    }

    /// Declare a prefix, shadowing any earlier declaration of the same name
    pub fn add_prefix(&mut self, prefix: impl Into<String>, iri: impl Into<String>) {
        self.declarations.push(Namespace::new(prefix, iri));
    }

    /// Get IRI for a prefix
    pub fn get_iri(&self, prefix: &str) -> PrefixResult<&str> {
        self.declarations
            .iter()
            .rev()
            .find(|ns| ns.prefix == prefix)
            .map(|ns| ns.iri.as_str())
            .ok_or_else(|| PrefixError::UnknownPrefix(prefix.to_string()))
    }

    /// Expand a compact IRI (prefix:local) to full IRI
    pub fn expand(&self, compact_iri: &str) -> PrefixResult<String> {
        let (prefix, local) = split_qname(compact_iri)
            .ok_or_else(|| PrefixError::InvalidIri(compact_iri.to_string()))?;
        let iri = self.get_iri(prefix)?;
        Ok(format!("{}{}", iri, local))
    }

    /// Compact an IRI using the most recently declared matching namespace
    pub fn compact(&self, iri: &str) -> Option<String> {
        self.declarations
            .iter()
            .rev()
            .filter(|ns| !ns.iri.is_empty() && iri.starts_with(&ns.iri))
            .find(|ns| self.get_iri(&ns.prefix).ok() == Some(ns.iri.as_str()))
            .map(|ns| format!("{}:{}", ns.prefix, &iri[ns.iri.len()..]))
    }

    /// All declarations, oldest first
    pub fn prefixes(&self) -> &[Namespace] {
        &self.declarations
    }

    /// Number of declarations (shadowed ones included)
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// True when nothing is declared
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

/// Split `prefix:local` at the first colon
pub fn split_qname(qname: &str) -> Option<(&str, &str)> {
    qname.find(':').map(|pos| (&qname[..pos], &qname[pos + 1..]))
}

/// Resolve an IRI reference against an optional base
///
/// Absolute references are returned unchanged; relative ones need a base.
pub fn resolve_iri(base: Option<&str>, reference: &str) -> PrefixResult<String> {
    if let Ok(absolute) = Iri::parse(reference) {
        return Ok(absolute.into_inner().to_string());
    }
    let base = base.ok_or_else(|| PrefixError::InvalidIri(reference.to_string()))?;
    let base = Iri::parse(base).map_err(|e| PrefixError::InvalidIri(format!("{}: {}", base, e)))?;
    base.resolve(reference)
        .map(|iri| iri.into_inner())
        .map_err(|e| PrefixError::InvalidIri(format!("{}: {}", reference, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_prefixes() {
        let mgr = NamespaceManager::with_common_prefixes();

        assert_eq!(
            mgr.get_iri("rdf").unwrap(),
            "http://www.w3.org/1999/02/22-rdf-syntax-ns#"
        );
        assert_eq!(
            mgr.get_iri("rdfs").unwrap(),
            "http://www.w3.org/2000/01/rdf-schema#"
        );
        assert_eq!(mgr.get_iri("xsd").unwrap(), "http://www.w3.org/2001/XMLSchema#");
        assert!(NamespaceManager::new().is_empty());
    }

    #[test]
    fn test_expand() {
        let mut mgr = NamespaceManager::with_common_prefixes();
        mgr.add_prefix("foaf", "http://xmlns.com/foaf/0.1/");

        let expanded = mgr.expand("foaf:name").unwrap();
        assert_eq!(expanded, "http://xmlns.com/foaf/0.1/name");

        let expanded = mgr.expand("rdf:type").unwrap();
        assert_eq!(expanded, "http://www.w3.org/1999/02/22-rdf-syntax-ns#type");
    }

    #[test]
    fn test_expand_errors() {
        let mgr = NamespaceManager::new();
        assert_eq!(
            mgr.expand("ex:alice"),
            Err(PrefixError::UnknownPrefix("ex".to_string()))
        );
        assert!(matches!(mgr.expand("noColon"), Err(PrefixError::InvalidIri(_))));
    }

    #[test]
    fn test_later_declaration_shadows() {
        let mut mgr = NamespaceManager::new();
        mgr.add_prefix("ex", "http://example.org/one/");
        mgr.add_prefix("ex", "http://example.org/two/");

        assert_eq!(mgr.expand("ex:a").unwrap(), "http://example.org/two/a");
        assert_eq!(mgr.len(), 2);
        // The shadowed namespace no longer compacts
        assert_eq!(mgr.compact("http://example.org/one/a"), None);
        assert_eq!(mgr.compact("http://example.org/two/a"), Some("ex:a".to_string()));
    }

    #[test]
    fn test_default_prefix() {
        let mut mgr = NamespaceManager::new();
        mgr.add_prefix("", "http://example.org/");
        assert_eq!(mgr.expand(":p1").unwrap(), "http://example.org/p1");
    }

    #[test]
    fn test_compact() {
        let mgr = NamespaceManager::with_common_prefixes();

        let compacted = mgr.compact("http://www.w3.org/1999/02/22-rdf-syntax-ns#type");
        assert_eq!(compacted, Some("rdf:type".to_string()));
        assert_eq!(mgr.compact("http://unknown.org/x"), None);
    }

    #[test]
    fn test_resolve_iri() {
        assert_eq!(
            resolve_iri(None, "http://example.org/a").unwrap(),
            "http://example.org/a"
        );
        assert_eq!(
            resolve_iri(Some("http://example.org/base/doc"), "other").unwrap(),
            "http://example.org/base/other"
        );
        assert!(resolve_iri(None, "relative").is_err());
    }
}
