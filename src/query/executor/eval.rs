//! Constraint expression evaluation
//!
//! Constraints are evaluated against the current variable bindings. Typed
//! comparisons follow the operand kinds (numbers, strings, booleans, terms);
//! a comparison between mismatched kinds is simply false, and any other
//! evaluation error makes the whole constraint false.

use crate::query::ast::{BinaryOp, Expression, UnaryOp};
use crate::query::variables::VariableTable;
use crate::rdf::{Literal, RdfTerm};
use regex::{Regex, RegexBuilder};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use thiserror::Error;
use tracing::debug;

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

const XSD_INTEGER_TYPES: [&str; 13] = [
    "integer",
    "int",
    "long",
    "short",
    "byte",
    "nonNegativeInteger",
    "nonPositiveInteger",
    "positiveInteger",
    "negativeInteger",
    "unsignedLong",
    "unsignedInt",
    "unsignedShort",
    "unsignedByte",
];

const XSD_FLOAT_TYPES: [&str; 3] = ["decimal", "double", "float"];

/// Evaluation errors (never surfaced; they make the constraint false)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Unbound variable in {0}")]
    Unbound(String),

    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    #[error("Invalid regex {pattern}: {reason}")]
    Regex { pattern: String, reason: String },

    #[error("Unsupported expression: {0}")]
    Unsupported(String),
}

type EvalResult<T> = Result<T, EvalError>;

/// Value produced while evaluating a constraint
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    /// IRIs, blank nodes, language-tagged strings and literals of other
    /// datatypes
    Term(RdfTerm),
    Unbound,
}

impl Value {
    /// Typed view of an RDF term
    pub fn from_term(term: &RdfTerm) -> Value {
        let RdfTerm::Literal(literal) = term else {
            return Value::Term(term.clone());
        };
        // Language-tagged strings stay terms so the tag takes part in equality
        let Some(local) = literal.datatype_iri().strip_prefix(XSD) else {
            return Value::Term(term.clone());
        };
        let lexical = literal.value().trim();
        let parsed = if XSD_INTEGER_TYPES.contains(&local) {
            lexical.parse().ok().map(Value::Integer)
        } else if XSD_FLOAT_TYPES.contains(&local) {
            lexical.parse().ok().map(Value::Double)
        } else if local == "boolean" {
            match lexical {
                "true" | "1" => Some(Value::Boolean(true)),
                "false" | "0" => Some(Value::Boolean(false)),
                _ => None,
            }
        } else if local == "string" {
            Some(Value::String(literal.value().to_string()))
        } else {
            None
        };
        parsed.unwrap_or_else(|| Value::Term(term.clone()))
    }

    /// Back to an RDF term, if the value has one
    pub fn into_term(self) -> Option<RdfTerm> {
        match self {
            Value::Boolean(b) => Some(RdfTerm::Literal(Literal::from(b))),
            Value::Integer(i) => Some(RdfTerm::Literal(Literal::from(i))),
            Value::Double(d) => Some(RdfTerm::Literal(Literal::from(d))),
            Value::String(s) => Some(RdfTerm::Literal(Literal::new_simple_literal(s))),
            Value::Term(t) => Some(t),
            Value::Unbound => None,
        }
    }

    /// Effective boolean value
    pub fn truthy(&self) -> EvalResult<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            Value::Integer(i) => Ok(*i != 0),
            Value::Double(d) => Ok(*d != 0.0 && !d.is_nan()),
            Value::String(s) => Ok(!s.is_empty()),
            Value::Term(t) => Err(EvalError::TypeMismatch(format!("{} is not a boolean", t))),
            Value::Unbound => Err(EvalError::Unbound("boolean test".to_string())),
        }
    }

    /// Lexical form used by string operators
    pub fn string_form(&self) -> Option<String> {
        match self {
            Value::Boolean(b) => Some(b.to_string()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Double(d) => Some(d.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Term(RdfTerm::NamedNode(n)) => Some(n.as_str().to_string()),
            Value::Term(RdfTerm::BlankNode(b)) => Some(b.as_str().to_string()),
            Value::Term(RdfTerm::Literal(l)) => Some(l.value().to_string()),
            Value::Unbound => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }
}

/// Evaluates constraint trees; caches compiled constant regexes across solutions
#[derive(Debug, Default)]
pub struct ConstraintEvaluator {
    verbose: bool,
    regex_cache: FxHashMap<String, Regex>,
}

impl ConstraintEvaluator {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            regex_cache: FxHashMap::default(),
        }
    }

    /// Whether `expr` holds under the current bindings
    pub fn matches(&mut self, expr: &Expression, table: &VariableTable) -> bool {
        match self.eval(expr, table).and_then(|v| v.truthy()) {
            Ok(result) => result,
            Err(e) => {
                if self.verbose {
                    debug!("Constraint {} evaluated to false: {}", expr, e);
                }
                false
            }
        }
    }

    /// Evaluate an expression to a value
    pub fn eval(&mut self, expr: &Expression, table: &VariableTable) -> EvalResult<Value> {
        match expr {
            Expression::Constant(term) => Ok(Value::from_term(term)),
            Expression::Slot(id) => Ok(table.value(*id).map_or(Value::Unbound, Value::from_term)),
            Expression::Variable(_) | Expression::Qname(_) | Expression::Iri(_) => {
                Err(EvalError::Unsupported(format!("unresolved {}", expr)))
            }
            Expression::Binary { op, left, right } => self.eval_binary(*op, left, right, table),
            Expression::Unary { op, expr: inner } => {
                let value = self.eval(inner, table)?;
                match op {
                    UnaryOp::Not => Ok(Value::Boolean(!value.truthy()?)),
                    UnaryOp::Neg => match value {
                        Value::Integer(i) => i
                            .checked_neg()
                            .map(Value::Integer)
                            .ok_or_else(|| EvalError::Arithmetic(format!("-{}", i))),
                        Value::Double(d) => Ok(Value::Double(-d)),
                        other => Err(EvalError::TypeMismatch(format!("cannot negate {:?}", other))),
                    },
                }
            }
            Expression::Function { name, args } => self.eval_function(name, args, table),
        }
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
        table: &VariableTable,
    ) -> EvalResult<Value> {
        // Connectives treat an erroring side as false
        match op {
            BinaryOp::And => {
                let l = self.eval(left, table).and_then(|v| v.truthy()).unwrap_or(false);
                if !l {
                    return Ok(Value::Boolean(false));
                }
                let r = self.eval(right, table).and_then(|v| v.truthy()).unwrap_or(false);
                return Ok(Value::Boolean(r));
            }
            BinaryOp::Or => {
                let l = self.eval(left, table).and_then(|v| v.truthy()).unwrap_or(false);
                if l {
                    return Ok(Value::Boolean(true));
                }
                let r = self.eval(right, table).and_then(|v| v.truthy()).unwrap_or(false);
                return Ok(Value::Boolean(r));
            }
            _ => {}
        }

        let l = self.eval(left, table)?;
        let r = self.eval(right, table)?;

        match op {
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                Ok(Value::Boolean(self.compare(op, &l, &r)))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                arithmetic(op, &l, &r)
            }
            BinaryOp::StrEq | BinaryOp::StrNe => {
                let (Some(ls), Some(rs)) = (l.string_form(), r.string_form()) else {
                    return Ok(Value::Boolean(false));
                };
                Ok(Value::Boolean((ls == rs) == (op == BinaryOp::StrEq)))
            }
            BinaryOp::StrMatch | BinaryOp::StrNotMatch => {
                let (Some(text), Some(pattern)) = (l.string_form(), r.string_form()) else {
                    return Ok(Value::Boolean(false));
                };
                // Patterns read from bindings vary per solution and are not cached
                let found = match right {
                    Expression::Constant(_) => self.cached_regex(&pattern)?.is_match(&text),
                    _ => compile_regex(&pattern)?.is_match(&text),
                };
                Ok(Value::Boolean(found == (op == BinaryOp::StrMatch)))
            }
            BinaryOp::And | BinaryOp::Or => Err(EvalError::Unsupported(op.to_string())),
        }
    }

    /// Typed comparison; mismatched or unbound operands compare false
    fn compare(&self, op: BinaryOp, l: &Value, r: &Value) -> bool {
        let ordering = match (l, r) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Integer(_) | Value::Double(_), Value::Integer(_) | Value::Double(_)) => {
                l.as_f64().zip(r.as_f64()).and_then(|(a, b)| a.partial_cmp(&b))
            }
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Term(a), Value::Term(b)) => match op {
                BinaryOp::Eq => return a == b,
                BinaryOp::Ne => return a != b,
                _ => None,
            },
            _ => None,
        };

        let Some(ordering) = ordering else {
            if self.verbose {
                debug!("Type mismatch comparing {:?} {} {:?}", l, op, r);
            }
            return false;
        };

        match op {
            BinaryOp::Eq => ordering == Ordering::Equal,
            BinaryOp::Ne => ordering != Ordering::Equal,
            BinaryOp::Lt => ordering == Ordering::Less,
            BinaryOp::Le => ordering != Ordering::Greater,
            BinaryOp::Gt => ordering == Ordering::Greater,
            BinaryOp::Ge => ordering != Ordering::Less,
            _ => false,
        }
    }

    fn eval_function(
        &mut self,
        name: &str,
        args: &[Expression],
        table: &VariableTable,
    ) -> EvalResult<Value> {
        let name = name.to_ascii_lowercase();
        let [arg] = args else {
            return Err(EvalError::Unsupported(format!("{}/{}", name, args.len())));
        };

        if name == "bound" {
            return match arg {
                Expression::Slot(id) => Ok(Value::Boolean(table.value(*id).is_some())),
                other => Err(EvalError::TypeMismatch(format!("bound({})", other))),
            };
        }

        let term = match arg {
            Expression::Slot(id) => table.value(*id).cloned(),
            Expression::Constant(term) => Some(term.clone()),
            other => self.eval(other, table)?.into_term(),
        };
        let term = term.ok_or_else(|| EvalError::Unbound(format!("{}()", name)))?;

        match name.as_str() {
            "str" => Ok(Value::String(
                Value::Term(term).string_form().unwrap_or_default(),
            )),
            "lang" => match term {
                RdfTerm::Literal(l) => Ok(Value::String(l.language().unwrap_or("").to_string())),
                other => Err(EvalError::TypeMismatch(format!("lang({})", other))),
            },
            "datatype" => match term {
                RdfTerm::Literal(l) => Ok(Value::Term(RdfTerm::NamedNode(l.datatype()))),
                other => Err(EvalError::TypeMismatch(format!("datatype({})", other))),
            },
            "isiri" | "isuri" => Ok(Value::Boolean(matches!(term, RdfTerm::NamedNode(_)))),
            "isblank" => Ok(Value::Boolean(matches!(term, RdfTerm::BlankNode(_)))),
            "isliteral" => Ok(Value::Boolean(matches!(term, RdfTerm::Literal(_)))),
            _ => Err(EvalError::Unsupported(format!("function {}", name))),
        }
    }

    /// Compile a constant `/pattern/flags` or bare pattern once
    fn cached_regex(&mut self, source: &str) -> EvalResult<&Regex> {
        if !self.regex_cache.contains_key(source) {
            let regex = compile_regex(source)?;
            self.regex_cache.insert(source.to_string(), regex);
        }
        self.regex_cache
            .get(source)
            .ok_or_else(|| EvalError::Unsupported(source.to_string()))
    }
}

fn compile_regex(source: &str) -> EvalResult<Regex> {
    let (pattern, flags) = match source.strip_prefix('/').and_then(|rest| rest.rsplit_once('/')) {
        Some((pattern, flags)) => (pattern, flags),
        None => (source, ""),
    };

    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            other => {
                return Err(EvalError::Regex {
                    pattern: source.to_string(),
                    reason: format!("unknown flag '{}'", other),
                })
            }
        };
    }
    builder.build().map_err(|e| EvalError::Regex {
        pattern: source.to_string(),
        reason: e.to_string(),
    })
}

fn arithmetic(op: BinaryOp, l: &Value, r: &Value) -> EvalResult<Value> {
    let overflow = || EvalError::Arithmetic(format!("{:?} {} {:?}", l, op, r));

    if let (Value::Integer(a), Value::Integer(b)) = (l, r) {
        let result = match op {
            BinaryOp::Add => a.checked_add(*b),
            BinaryOp::Sub => a.checked_sub(*b),
            BinaryOp::Mul => a.checked_mul(*b),
            BinaryOp::Rem => a.checked_rem(*b),
            BinaryOp::Div => {
                if *b == 0 {
                    return Err(overflow());
                }
                return Ok(Value::Double(*a as f64 / *b as f64));
            }
            _ => None,
        };
        return result.map(Value::Integer).ok_or_else(overflow);
    }

    let (Some(a), Some(b)) = (l.as_f64(), r.as_f64()) else {
        return Err(EvalError::TypeMismatch(format!("{:?} {} {:?}", l, op, r)));
    };
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a % b,
        _ => return Err(EvalError::Unsupported(op.to_string())),
    };
    Ok(Value::Double(result))
}
