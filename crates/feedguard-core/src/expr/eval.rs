use std::{borrow::Cow, fmt};

use crate::{
    expr::{ArithOp, EvalError, Expr, Literal},
    tables::Cell,
    utils::operator::CompOperator,
};

/// Runtime value of an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Null,
    Bool(bool),
    Number(f64),
    Str(Cow<'a, str>),
}

impl<'a> Value<'a> {
    pub fn into_owned(self) -> Value<'static> {
        match self {
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(b),
            Value::Number(n) => Value::Number(n),
            Value::Str(s) => Value::Str(Cow::Owned(s.into_owned())),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
        }
    }

    /// Numbers, and strings holding a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Str(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Boolean reading of a value. Null is false.
    pub fn truthy(&self) -> Result<bool, EvalError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Null => Ok(false),
            other => Err(EvalError::NotBoolean {
                found: other.describe(),
            }),
        }
    }

    fn describe(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            other => format!("{} {}", other.type_name(), other),
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "'{s}'"),
        }
    }
}

impl<'a> From<Cell<'a>> for Value<'a> {
    fn from(cell: Cell<'a>) -> Self {
        match cell {
            Cell::Null => Value::Null,
            Cell::Bool(b) => Value::Bool(b),
            Cell::Int(v) => Value::Number(v as f64),
            Cell::Float(v) => Value::Number(v),
            Cell::Str(s) => Value::Str(Cow::Borrowed(s)),
        }
    }
}

/// Column values an expression is evaluated against, by bound position.
pub trait Bindings {
    fn value(&self, column: usize) -> Value<'_>;
}

impl Bindings for [Value<'_>] {
    fn value(&self, column: usize) -> Value<'_> {
        self.get(column).cloned().unwrap_or(Value::Null)
    }
}

impl Expr<usize> {
    pub fn eval<'a, B: Bindings + ?Sized>(&'a self, row: &'a B) -> Result<Value<'a>, EvalError> {
        match self {
            Expr::Column(c) => Ok(row.value(*c)),
            Expr::Literal(l) => Ok(match l {
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Number(n) => Value::Number(*n),
                Literal::Str(s) => Value::Str(Cow::Borrowed(s.as_str())),
            }),
            Expr::Neg(e) => match e.eval(row)? {
                Value::Null => Ok(Value::Null),
                v => match v.as_number() {
                    Some(n) => Ok(Value::Number(-n)),
                    None => Err(EvalError::TypeMismatch {
                        op: "-",
                        left: "nothing".to_string(),
                        right: v.describe(),
                    }),
                },
            },
            Expr::Arith { op, left, right } => arith(*op, left.eval(row)?, right.eval(row)?),
            Expr::Compare { op, left, right } => {
                compare(*op, &left.eval(row)?, &right.eval(row)?).map(Value::Bool)
            }
            Expr::In {
                expr,
                list,
                negated,
            } => {
                let value = expr.eval(row)?;
                if value == Value::Null {
                    return Ok(Value::Bool(false));
                }
                let mut found = false;
                for item in list {
                    if compare(CompOperator::Eq, &value, &item.eval(row)?)? {
                        found = true;
                        break;
                    }
                }
                Ok(Value::Bool(found != *negated))
            }
            Expr::And(l, r) => {
                if !l.eval(row)?.truthy()? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(r.eval(row)?.truthy()?))
            }
            Expr::Or(l, r) => {
                if l.eval(row)?.truthy()? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(r.eval(row)?.truthy()?))
            }
            Expr::Not(e) => Ok(Value::Bool(!e.eval(row)?.truthy()?)),
        }
    }

    /// Evaluates to a boolean; null counts as false.
    pub fn eval_bool<B: Bindings + ?Sized>(&self, row: &B) -> Result<bool, EvalError> {
        self.eval(row)?.truthy()
    }
}

fn arith(op: ArithOp, left: Value<'_>, right: Value<'_>) -> Result<Value<'static>, EvalError> {
    if left == Value::Null || right == Value::Null {
        return Ok(Value::Null);
    }
    let (Some(l), Some(r)) = (left.as_number(), right.as_number()) else {
        return Err(EvalError::TypeMismatch {
            op: op.symbol(),
            left: left.describe(),
            right: right.describe(),
        });
    };
    let value = match op {
        ArithOp::Add => l + r,
        ArithOp::Sub => l - r,
        ArithOp::Mul => l * r,
        ArithOp::Div => {
            if r == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            l / r
        }
    };
    Ok(Value::Number(value))
}

/// Comparison against null is false. Two strings compare as text, a number
/// against a numeric string compares numerically. Other type mixes are
/// unequal, and an error for ordering operators.
fn compare(op: CompOperator, left: &Value<'_>, right: &Value<'_>) -> Result<bool, EvalError> {
    let ordering = match (left, right) {
        (Value::Null, _) | (_, Value::Null) => return Ok(false),
        (Value::Str(l), Value::Str(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            match (left.as_number(), right.as_number()) {
                (Some(l), Some(r)) => l.partial_cmp(&r),
                _ => return mismatch(op, left, right),
            }
        }
        _ => return mismatch(op, left, right),
    };
    Ok(ordering.is_some_and(|o| op.holds(o)))
}

fn mismatch(op: CompOperator, left: &Value<'_>, right: &Value<'_>) -> Result<bool, EvalError> {
    match op {
        CompOperator::Eq => Ok(false),
        CompOperator::Ne => Ok(true),
        _ => Err(EvalError::TypeMismatch {
            op: op.symbol(),
            left: left.describe(),
            right: right.describe(),
        }),
    }
}
