//! Query errors and diagnostics
//!
//! Every compile or execution failure is a [`QueryError`]. Failures that
//! happen while compiling are also recorded on the query as a [`Diagnostic`]
//! carrying a severity and the source location the front-end supplied.

use crate::query::executor::matcher::MatchError;
use std::fmt;
use thiserror::Error;

/// Query compile and execution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A prefixed name uses a prefix that was never declared
    #[error("Undeclared prefix '{prefix}' in '{qname}'")]
    UndeclaredPrefix {
        /// The missing prefix
        prefix: String,
        /// The full prefixed name
        qname: String,
    },

    /// A relative IRI could not be resolved, or an IRI is malformed
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),

    /// The same variable was declared twice in the variable table
    #[error("Variable declared twice: {0}")]
    DuplicateVariableDeclaration(String),

    /// Nothing selected and nothing to match
    #[error("Query defines no variables")]
    NoVariables,

    /// Execution requested on a failed or unprepared query
    #[error("Query is not ready for execution")]
    QueryNotReady,

    /// The triple store reported a fault
    #[error(transparent)]
    StoreMatchFailure(#[from] MatchError),

    /// Execution stopped by the abort flag
    #[error("Query execution aborted")]
    Aborted,

    /// An engine with this name is already registered
    #[error("Query engine already registered: {0}")]
    DuplicateName(String),

    /// No engine matches the requested name or URI
    #[error("Query engine not found: {0}")]
    NotFound(String),
}

pub type QueryResult<T> = Result<T, QueryError>;

impl QueryError {
    /// Severity this error is reported with
    pub fn severity(&self) -> Severity {
        match self {
            QueryError::UndeclaredPrefix { .. }
            | QueryError::InvalidIri(_)
            | QueryError::NoVariables
            | QueryError::QueryNotReady
            | QueryError::DuplicateName(_)
            | QueryError::NotFound(_) => Severity::Error,
            QueryError::DuplicateVariableDeclaration(_) | QueryError::StoreMatchFailure(_) => {
                Severity::Fatal
            }
            QueryError::Aborted => Severity::Warning,
        }
    }
}

/// Diagnostic severity channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Does not invalidate the query
    Warning,
    /// Recoverable, but the query can no longer run
    Error,
    /// Unrecoverable for this query
    Fatal,
}

impl Severity {
    /// Whether a diagnostic of this severity marks the query failed
    pub fn invalidates(self) -> bool {
        self >= Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Fatal => write!(f, "fatal error"),
        }
    }
}

/// Source location of a diagnostic
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locator {
    /// Document the query came from
    pub uri: Option<String>,
    /// 1-based line, if known
    pub line: Option<usize>,
    /// 1-based column, if known
    pub column: Option<usize>,
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri.as_deref().unwrap_or("<query>"))?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
            if let Some(column) = self.column {
                write!(f, ":{}", column)?;
            }
        }
        Ok(())
    }
}

/// One reported problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub locator: Locator,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.locator, self.severity, self.message)
    }
}

/// Handler a caller registers for one severity
pub type DiagnosticHandler = Box<dyn FnMut(&Diagnostic) + Send>;
