//! Query building blocks produced by front-ends
//!
//! Front-ends fill a [`Query`](crate::query::Query) with these raw pieces:
//! triple patterns whose positions may still be prefixed names, relative
//! IRIs or named variables, and constraint expressions of the same kind.
//! The compile stages rewrite them in place into resolved terms and
//! variable slots.

use crate::query::error::QueryResult;
use crate::query::variables::VarId;
use crate::rdf::{Literal, RdfTerm, TriplePosition};
use std::fmt;

/// One position of a triple pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternTerm {
    /// Fully resolved RDF term
    Term(RdfTerm),
    /// IRI reference, possibly relative to the query base
    Iri(String),
    /// Prefixed name `prefix:local`, expanded during compilation
    Qname(String),
    /// Variable by name, before binding
    Variable(String),
    /// Variable after binding: index into the variable table
    Slot(VarId),
}

impl PatternTerm {
    pub fn var(name: impl Into<String>) -> Self {
        PatternTerm::Variable(name.into())
    }

    pub fn qname(qname: impl Into<String>) -> Self {
        PatternTerm::Qname(qname.into())
    }

    pub fn iri(iri: impl Into<String>) -> Self {
        PatternTerm::Iri(iri.into())
    }

    pub fn literal(value: impl Into<Literal>) -> Self {
        PatternTerm::Term(RdfTerm::Literal(value.into()))
    }

    /// True for named variables and bound slots
    pub fn is_variable(&self) -> bool {
        matches!(self, PatternTerm::Variable(_) | PatternTerm::Slot(_))
    }

    pub fn slot(&self) -> Option<VarId> {
        match self {
            PatternTerm::Slot(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<RdfTerm> for PatternTerm {
    fn from(term: RdfTerm) -> Self {
        PatternTerm::Term(term)
    }
}

impl fmt::Display for PatternTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternTerm::Term(t) => write!(f, "{}", t),
            PatternTerm::Iri(iri) => write!(f, "<{}>", iri),
            PatternTerm::Qname(q) => write!(f, "{}", q),
            PatternTerm::Variable(name) => write!(f, "?{}", name),
            PatternTerm::Slot(id) => write!(f, "?{}", id),
        }
    }
}

/// A subject/predicate/object template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTriple {
    pub subject: PatternTerm,
    pub predicate: PatternTerm,
    pub object: PatternTerm,
}

impl QueryTriple {
    pub fn new(
        subject: impl Into<PatternTerm>,
        predicate: impl Into<PatternTerm>,
        object: impl Into<PatternTerm>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    pub fn term(&self, position: TriplePosition) -> &PatternTerm {
        match position {
            TriplePosition::Subject => &self.subject,
            TriplePosition::Predicate => &self.predicate,
            TriplePosition::Object => &self.object,
        }
    }

    pub fn terms_mut(&mut self) -> [&mut PatternTerm; 3] {
        [&mut self.subject, &mut self.predicate, &mut self.object]
    }

    /// No position is a variable
    pub fn is_exact(&self) -> bool {
        TriplePosition::ALL
            .iter()
            .all(|&pos| !self.term(pos).is_variable())
    }

    /// Distinct variable slots, in subject/predicate/object order
    pub fn slots(&self) -> Vec<VarId> {
        let mut slots = Vec::with_capacity(3);
        for pos in TriplePosition::ALL {
            if let Some(id) = self.term(pos).slot() {
                if !slots.contains(&id) {
                    slots.push(id);
                }
            }
        }
        slots
    }
}

impl fmt::Display for QueryTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.subject, self.predicate, self.object)
    }
}

/// A `prefix → namespace` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefix {
    pub prefix: String,
    pub namespace: String,
}

impl Prefix {
    pub fn new(prefix: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            namespace: namespace.into(),
        }
    }
}

/// Binary operators of the constraint language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `&&`
    And,
    /// `||`
    Or,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `eq` (string equality)
    StrEq,
    /// `ne` (string inequality)
    StrNe,
    /// `=~` (regex match)
    StrMatch,
    /// `!~` (regex non-match)
    StrNotMatch,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::StrEq => "eq",
            BinaryOp::StrNe => "ne",
            BinaryOp::StrMatch => "=~",
            BinaryOp::StrNotMatch => "!~",
        };
        write!(f, "{}", symbol)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// unary `-`
    Neg,
}

/// Constraint expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Resolved constant
    Constant(RdfTerm),
    /// IRI reference, possibly relative
    Iri(String),
    /// Prefixed name
    Qname(String),
    /// Variable by name
    Variable(String),
    /// Variable after binding
    Slot(VarId),
    /// Binary operation
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// Unary operation
    Unary {
        op: UnaryOp,
        expr: Box<Expression>,
    },
    /// Built-in function call
    Function {
        name: String,
        args: Vec<Expression>,
    },
}

impl Expression {
    pub fn var(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    pub fn integer(value: i64) -> Self {
        Expression::Constant(RdfTerm::Literal(Literal::from(value)))
    }

    pub fn double(value: f64) -> Self {
        Expression::Constant(RdfTerm::Literal(Literal::from(value)))
    }

    pub fn boolean(value: bool) -> Self {
        Expression::Constant(RdfTerm::Literal(Literal::from(value)))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expression::Constant(RdfTerm::Literal(Literal::new_simple_literal(value)))
    }

    pub fn qname(qname: impl Into<String>) -> Self {
        Expression::Qname(qname.into())
    }

    pub fn iri(iri: impl Into<String>) -> Self {
        Expression::Iri(iri.into())
    }

    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(left: Expression, right: Expression) -> Self {
        Self::binary(BinaryOp::And, left, right)
    }

    pub fn not(expr: Expression) -> Self {
        Expression::Unary {
            op: UnaryOp::Not,
            expr: Box::new(expr),
        }
    }

    pub fn function(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Function {
            name: name.into(),
            args,
        }
    }

    /// Apply `f` to every leaf (non-operator) node, depth first
    pub fn try_for_each_leaf_mut<F>(&mut self, f: &mut F) -> QueryResult<()>
    where
        F: FnMut(&mut Expression) -> QueryResult<()>,
    {
        match self {
            Expression::Binary { left, right, .. } => {
                left.try_for_each_leaf_mut(f)?;
                right.try_for_each_leaf_mut(f)
            }
            Expression::Unary { expr, .. } => expr.try_for_each_leaf_mut(f),
            Expression::Function { args, .. } => {
                args.iter_mut().try_for_each(|arg| arg.try_for_each_leaf_mut(f))
            }
            leaf => f(leaf),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(t) => write!(f, "{}", t),
            Expression::Iri(iri) => write!(f, "<{}>", iri),
            Expression::Qname(q) => write!(f, "{}", q),
            Expression::Variable(name) => write!(f, "?{}", name),
            Expression::Slot(id) => write!(f, "?{}", id),
            Expression::Binary { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Expression::Unary { op: UnaryOp::Not, expr } => write!(f, "!{}", expr),
            Expression::Unary { op: UnaryOp::Neg, expr } => write!(f, "-{}", expr),
            Expression::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_triple() {
        let exact = QueryTriple::new(
            PatternTerm::qname(":p1"),
            PatternTerm::qname(":knows"),
            PatternTerm::qname(":p2"),
        );
        assert!(exact.is_exact());

        let open = QueryTriple::new(PatternTerm::var("x"), PatternTerm::qname(":knows"), PatternTerm::var("y"));
        assert!(!open.is_exact());
        assert_eq!(open.to_string(), "(?x :knows ?y)");
    }

    #[test]
    fn test_slots_are_distinct() {
        let triple = QueryTriple::new(
            PatternTerm::Slot(VarId(1)),
            PatternTerm::qname(":p"),
            PatternTerm::Slot(VarId(1)),
        );
        assert_eq!(triple.slots(), vec![VarId(1)]);
    }

    #[test]
    fn test_leaf_walk_reaches_function_args() {
        let mut expr = Expression::and(
            Expression::binary(BinaryOp::Gt, Expression::var("x"), Expression::integer(5)),
            Expression::function("bound", vec![Expression::var("y")]),
        );

        let mut names = Vec::new();
        expr.try_for_each_leaf_mut(&mut |leaf| {
            if let Expression::Variable(name) = leaf {
                names.push(name.clone());
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(names, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_expression_display() {
        let expr = Expression::not(Expression::binary(
            BinaryOp::StrEq,
            Expression::var("name"),
            Expression::qname("ex:alice"),
        ));
        assert_eq!(expr.to_string(), "!(?name eq ex:alice)");
    }
}
