//! Restricted expression language of business rule conditions.
//!
//! Comparisons, arithmetic, `in (...)` membership, boolean connectives,
//! parentheses, column identifiers and literals. Nothing else parses.
//! Expressions are parsed with column names ([`Expr<String>`]) and bound to
//! column positions ([`Expr<usize>`]) before evaluation.
use thiserror::Error;

use crate::utils::operator::CompOperator;

mod eval;
mod lexer;
mod parser;


pub use eval::{Bindings, Value};
pub use parser::parse;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("Unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("Unterminated string literal starting at position {pos}")]
    UnterminatedString { pos: usize },

    #[error("Invalid number '{literal}' at position {pos}")]
    InvalidNumber { literal: String, pos: usize },

    #[error("Unexpected token '{found}' at position {pos}")]
    UnexpectedToken { found: String, pos: usize },

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Expression is empty")]
    Empty,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Division by zero")]
    DivisionByZero,

    #[error("Cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: String,
        right: String,
    },

    #[error("Expected a boolean, found {found}")]
    NotBoolean { found: String },

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Number(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

/// Expression tree; `C` is a column reference, a name or a bound position.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<C = String> {
    Column(C),
    Literal(Literal),
    Neg(Box<Expr<C>>),
    Arith {
        op: ArithOp,
        left: Box<Expr<C>>,
        right: Box<Expr<C>>,
    },
    Compare {
        op: CompOperator,
        left: Box<Expr<C>>,
        right: Box<Expr<C>>,
    },
    In {
        expr: Box<Expr<C>>,
        list: Vec<Expr<C>>,
        negated: bool,
    },
    And(Box<Expr<C>>, Box<Expr<C>>),
    Or(Box<Expr<C>>, Box<Expr<C>>),
    Not(Box<Expr<C>>),
}

impl<C> Expr<C> {
    /// Column references in order of first appearance, without repeats.
    pub fn columns(&self) -> Vec<&C>
    where
        C: PartialEq,
    {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a C>)
    where
        C: PartialEq,
    {
        match self {
            Expr::Column(c) => {
                if !out.contains(&c) {
                    out.push(c);
                }
            }
            Expr::Literal(_) => {}
            Expr::Neg(e) | Expr::Not(e) => e.collect_columns(out),
            Expr::Arith { left, right, .. }
            | Expr::Compare { left, right, .. }
            | Expr::And(left, right)
            | Expr::Or(left, right) => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::In { expr, list, .. } => {
                expr.collect_columns(out);
                list.iter().for_each(|e| e.collect_columns(out));
            }
        }
    }

    pub fn is_constant(&self) -> bool
    where
        C: PartialEq,
    {
        self.columns().is_empty()
    }

    /// Rewrites every column reference through `resolve`.
    pub fn bind<D, E, F>(&self, resolve: &mut F) -> Result<Expr<D>, E>
    where
        F: FnMut(&C) -> Result<D, E>,
    {
        Ok(match self {
            Expr::Column(c) => Expr::Column(resolve(c)?),
            Expr::Literal(l) => Expr::Literal(l.clone()),
            Expr::Neg(e) => Expr::Neg(Box::new(e.bind(resolve)?)),
            Expr::Not(e) => Expr::Not(Box::new(e.bind(resolve)?)),
            Expr::Arith { op, left, right } => Expr::Arith {
                op: *op,
                left: Box::new(left.bind(resolve)?),
                right: Box::new(right.bind(resolve)?),
            },
            Expr::Compare { op, left, right } => Expr::Compare {
                op: *op,
                left: Box::new(left.bind(resolve)?),
                right: Box::new(right.bind(resolve)?),
            },
            Expr::In {
                expr,
                list,
                negated,
            } => Expr::In {
                expr: Box::new(expr.bind(resolve)?),
                list: list
                    .iter()
                    .map(|e| e.bind(resolve))
                    .collect::<Result<Vec<_>, _>>()?,
                negated: *negated,
            },
            Expr::And(l, r) => Expr::And(Box::new(l.bind(resolve)?), Box::new(r.bind(resolve)?)),
            Expr::Or(l, r) => Expr::Or(Box::new(l.bind(resolve)?), Box::new(r.bind(resolve)?)),
        })
    }
}

impl Expr<String> {
    /// Evaluates an expression that references no column.
    pub fn eval_constant(&self) -> Result<Value<'static>, EvalError> {
        let bound: Expr<usize> =
            self.bind(&mut |name: &String| Err(EvalError::UnknownColumn(name.clone())))?;
        let no_columns: [Value<'static>; 0] = [];
        bound.eval(&no_columns[..]).map(Value::into_owned)
    }
}
