//! Query solutions and result sets
//!
//! A solution is one row: the select variables, in select order, each bound
//! to a term or left unbound.

use crate::rdf::RdfTerm;
use indexmap::IndexMap;
use serde_json::{json, Map, Value as JsonValue};

const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// Result serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFormat {
    /// SPARQL 1.1 Query Results JSON
    Json,
    /// Tab separated, terms in N-Triples syntax
    Tsv,
}

/// One solution (select variable bindings)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySolution {
    bindings: IndexMap<String, Option<RdfTerm>>,
}

impl QuerySolution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a select variable with its value
    pub fn push(&mut self, variable: impl Into<String>, value: Option<RdfTerm>) {
        self.bindings.insert(variable.into(), value);
    }

    /// Bound value of a variable
    pub fn get(&self, variable: &str) -> Option<&RdfTerm> {
        self.bindings.get(variable).and_then(Option::as_ref)
    }

    pub fn is_bound(&self, variable: &str) -> bool {
        self.get(variable).is_some()
    }

    /// Number of select variables, bound or not
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Values in select order
    pub fn values(&self) -> impl Iterator<Item = Option<&RdfTerm>> {
        self.bindings.values().map(Option::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&RdfTerm>)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}

/// Collected solutions of one execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResults {
    /// Select variable names, in select order
    pub variables: Vec<String>,
    pub solutions: Vec<QuerySolution>,
}

impl QueryResults {
    pub fn new(variables: Vec<String>) -> Self {
        Self {
            variables,
            solutions: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QuerySolution> {
        self.solutions.iter()
    }

    /// SPARQL JSON results document
    pub fn to_json(&self) -> JsonValue {
        let bindings: Vec<JsonValue> = self
            .solutions
            .iter()
            .map(|solution| {
                let row: Map<String, JsonValue> = solution
                    .iter()
                    .filter_map(|(name, value)| value.map(|term| (name.to_string(), term_to_json(term))))
                    .collect();
                JsonValue::Object(row)
            })
            .collect();

        json!({
            "head": { "vars": self.variables },
            "results": { "bindings": bindings },
        })
    }

    /// Tab separated rows with a `?var` header line
    pub fn to_tsv(&self) -> String {
        let mut out = self
            .variables
            .iter()
            .map(|v| format!("?{}", v))
            .collect::<Vec<_>>()
            .join("\t");
        out.push('\n');

        for solution in &self.solutions {
            let row: Vec<String> = solution
                .values()
                .map(|value| value.map(term_to_ntriples).unwrap_or_default())
                .collect();
            out.push_str(&row.join("\t"));
            out.push('\n');
        }
        out
    }

    pub fn serialize(&self, format: ResultFormat) -> Result<String, serde_json::Error> {
        match format {
            ResultFormat::Json => serde_json::to_string_pretty(&self.to_json()),
            ResultFormat::Tsv => Ok(self.to_tsv()),
        }
    }
}

impl IntoIterator for QueryResults {
    type Item = QuerySolution;
    type IntoIter = std::vec::IntoIter<QuerySolution>;

    fn into_iter(self) -> Self::IntoIter {
        self.solutions.into_iter()
    }
}

fn term_to_json(term: &RdfTerm) -> JsonValue {
    match term {
        RdfTerm::NamedNode(n) => json!({ "type": "uri", "value": n.as_str() }),
        RdfTerm::BlankNode(b) => json!({ "type": "bnode", "value": b.as_str() }),
        RdfTerm::Literal(l) => {
            let mut object = Map::new();
            object.insert("type".to_string(), json!("literal"));
            object.insert("value".to_string(), json!(l.value()));
            if let Some(lang) = l.language() {
                object.insert("xml:lang".to_string(), json!(lang));
            } else if l.datatype_iri() != XSD_STRING {
                object.insert("datatype".to_string(), json!(l.datatype_iri()));
            }
            JsonValue::Object(object)
        }
    }
}

fn term_to_ntriples(term: &RdfTerm) -> String {
    match term {
        RdfTerm::Literal(l) => l.inner().to_string(),
        other => other.to_string(),
    }
}
