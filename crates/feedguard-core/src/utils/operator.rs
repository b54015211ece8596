use std::cmp::Ordering;
use std::fmt;

/// Comparison operators of the condition grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOperator {
    Gt,
    Gte,
    Eq,
    Ne,
    Lte,
    Lt,
}

impl CompOperator {
    /// Whether an ordering between two operands satisfies the operator.
    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            CompOperator::Gt => ordering == Ordering::Greater,
            CompOperator::Gte => ordering != Ordering::Less,
            CompOperator::Eq => ordering == Ordering::Equal,
            CompOperator::Ne => ordering != Ordering::Equal,
            CompOperator::Lte => ordering != Ordering::Greater,
            CompOperator::Lt => ordering == Ordering::Less,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompOperator::Gt => ">",
            CompOperator::Gte => ">=",
            CompOperator::Eq => "=",
            CompOperator::Ne => "!=",
            CompOperator::Lte => "<=",
            CompOperator::Lt => "<",
        }
    }
}

impl fmt::Display for CompOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
