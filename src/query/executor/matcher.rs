//! Triple match adapter
//!
//! The join engine never touches a concrete store. Each active pattern asks a
//! [`TripleSource`] for a [`TripleCursor`] over the statements unifying with
//! the pattern's bound positions, then walks it with `current`/`advance`.

use crate::rdf::{Triple, TriplePattern};
use thiserror::Error;

/// Fault raised by a store while matching (distinct from "no match")
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// The store could not answer the pattern
    #[error("Store failure while matching {pattern}: {reason}")]
    Store {
        /// Pattern being matched
        pattern: String,
        /// Store-provided reason
        reason: String,
    },

    /// Cursor used after `close`
    #[error("Cursor already closed")]
    Closed,
}

pub type MatchResult<T> = Result<T, MatchError>;

/// A store that can answer partially bound triple patterns
pub trait TripleSource {
    /// Open a cursor over all statements matching `pattern`
    fn open<'a>(&'a self, pattern: &TriplePattern) -> MatchResult<Box<dyn TripleCursor + 'a>>;
}

impl<T: TripleSource + ?Sized> TripleSource for &T {
    fn open<'a>(&'a self, pattern: &TriplePattern) -> MatchResult<Box<dyn TripleCursor + 'a>> {
        (**self).open(pattern)
    }
}

/// Iteration handle over the candidates for one pattern
pub trait TripleCursor {
    /// Candidate under the cursor, `None` once exhausted
    fn current(&self) -> Option<&Triple>;

    /// Move to the next candidate
    fn advance(&mut self) -> MatchResult<()>;

    /// True when no candidate remains
    fn is_exhausted(&self) -> bool {
        self.current().is_none()
    }

    /// Release store resources held by the cursor
    fn close(&mut self) {}
}

/// Cursor over an already materialized candidate list
pub struct VecCursor {
    triples: Vec<Triple>,
    current: usize,
    closed: bool,
}

impl VecCursor {
    /// Create a cursor positioned on the first candidate
    pub fn new(triples: Vec<Triple>) -> Self {
        Self {
            triples,
            current: 0,
            closed: false,
        }
    }
}

impl TripleCursor for VecCursor {
    fn current(&self) -> Option<&Triple> {
        if self.closed {
            return None;
        }
        self.triples.get(self.current)
    }

    fn advance(&mut self) -> MatchResult<()> {
        if self.closed {
            return Err(MatchError::Closed);
        }
        if self.current < self.triples.len() {
            self.current += 1;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
        self.triples.clear();
    }
}
