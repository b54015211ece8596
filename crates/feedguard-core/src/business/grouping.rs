//! Grouped evaluation: rows selected by the condition are partitioned by
//! their `group_by` tuple and the validation runs once per group.
use std::collections::HashMap;

use rayon::prelude::*;

use crate::{
    business::{
        evaluator::{describe_values, judge, RowView, Verdict, DIVISION_BY_ZERO, VALIDATION_FAILED},
        CompiledBusinessRule,
    },
    errors::RuleError,
    expr::{Bindings, EvalError, Expr, Value},
    results::RuleOutcome,
    rules::{FailureAccumulator, RuleContext},
    tables::{Cell, RowChunk, Table},
    utils::hasher::{composite_key, Xxh3Builder},
};

/// Aggregated value of one column within a group.
#[derive(Debug, Clone)]
enum Aggregate {
    /// Group key column: the group's value.
    Key(Value<'static>),
    /// Any other column. Summed while every non-null value reads as a
    /// number, numeric text included; otherwise the first row's value.
    Measure {
        sum: Option<f64>,
        numeric: bool,
        first: Value<'static>,
    },
}

impl Aggregate {
    fn measure(cell: Cell<'_>) -> Self {
        let sum = cell.as_f64();
        Aggregate::Measure {
            sum,
            numeric: sum.is_some() || cell.is_null(),
            first: Value::from(cell).into_owned(),
        }
    }

    fn absorb(&mut self, other: Aggregate) {
        if let (
            Aggregate::Measure { sum, numeric, .. },
            Aggregate::Measure {
                sum: other_sum,
                numeric: other_numeric,
                ..
            },
        ) = (self, other)
        {
            *numeric &= other_numeric;
            if let Some(v) = other_sum {
                *sum = Some(sum.unwrap_or(0.0) + v);
            }
        }
    }

    fn value(&self) -> Value<'static> {
        match self {
            Aggregate::Key(v) => v.clone(),
            Aggregate::Measure {
                sum, numeric: true, ..
            } => sum.map_or(Value::Null, Value::Number),
            Aggregate::Measure { first, .. } => first.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct Group {
    labels: Vec<String>,
    values: Vec<Aggregate>,
    division_by_zero: bool,
}

impl Group {
    fn absorb(&mut self, other: Group) {
        self.division_by_zero |= other.division_by_zero;
        for (mine, theirs) in self.values.iter_mut().zip(other.values) {
            mine.absorb(theirs);
        }
    }
}

impl Bindings for Group {
    fn value(&self, column: usize) -> Value<'_> {
        self.values
            .get(column)
            .map(Aggregate::value)
            .unwrap_or(Value::Null)
    }
}

/// Groups keyed by their rendered tuple, in order of first appearance.
#[derive(Default)]
struct Groups {
    order: Vec<Group>,
    index: HashMap<String, usize, Xxh3Builder>,
}

impl Groups {
    fn upsert(&mut self, key: String, group: Group) {
        match self.index.get(&key) {
            Some(&i) => self.order[i].absorb(group),
            None => {
                self.index.insert(key, self.order.len());
                self.order.push(group);
            }
        }
    }

    /// Folds a later chunk's groups into these ones.
    fn merge(&mut self, other: Groups) {
        let mut keys: Vec<(String, usize)> = other.index.into_iter().collect();
        keys.sort_unstable_by_key(|(_, i)| *i);
        for ((key, _), group) in keys.into_iter().zip(other.order) {
            self.upsert(key, group);
        }
    }
}

pub(super) fn evaluate_groups(
    rule: &CompiledBusinessRule,
    table: &dyn Table,
    columns: &[&str],
    condition: Option<&Expr<usize>>,
    validation: &Expr<usize>,
    ctx: &RuleContext,
) -> Result<RuleOutcome, RuleError> {
    let group_by = &rule.rule().group_by;
    let chunks = table.row_chunks(columns)?;
    ctx.deadline.check()?;

    let partials = chunks
        .par_iter()
        .map(|chunk| collect_groups(chunk, group_by.len(), condition, ctx))
        .collect::<Result<Vec<_>, RuleError>>()?;
    let mut groups = Groups::default();
    for partial in partials {
        groups.merge(partial);
    }

    let mut acc = FailureAccumulator::new(ctx.sample_size);
    acc.declare(VALIDATION_FAILED);
    acc.declare(DIVISION_BY_ZERO);
    for group in &groups.order {
        ctx.deadline.check()?;
        acc.check();
        let label = || {
            group_by
                .iter()
                .zip(&group.labels)
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let verdict = if group.division_by_zero {
            Verdict::DivisionByZero
        } else {
            judge(group, None, validation)?
        };
        match verdict {
            Verdict::Excluded | Verdict::Passed => {}
            Verdict::Failed => acc.fail(VALIDATION_FAILED, || {
                format!(
                    "group ({}): validation failed ({})",
                    label(),
                    describe_values(group, columns, validation)
                )
            }),
            Verdict::DivisionByZero => acc.fail(DIVISION_BY_ZERO, || {
                format!("group ({}): division by zero", label())
            }),
        }
    }

    Ok(acc
        .into_outcome()
        .with_detail("grouped", true)
        .with_detail("group_by", group_by.clone())
        .with_detail("groups", groups.order.len()))
}

/// Groups of one chunk. The first `group_width` columns are the group keys;
/// the columns after them are aggregated.
///
/// A row whose condition divides by zero still joins its group and marks it
/// as failed.
fn collect_groups(
    chunk: &RowChunk,
    group_width: usize,
    condition: Option<&Expr<usize>>,
    ctx: &RuleContext,
) -> Result<Groups, RuleError> {
    let mut groups = Groups::default();

    for row in 0..chunk.len() {
        ctx.deadline.check_every(row)?;
        let view = RowView { chunk, row };
        let division_by_zero = match condition.map(|c| c.eval_bool(&view)) {
            None | Some(Ok(true)) => false,
            Some(Ok(false)) => continue,
            Some(Err(EvalError::DivisionByZero)) => true,
            Some(Err(e)) => return Err(e.into()),
        };

        let parts: Vec<Option<String>> = (0..group_width)
            .map(|col| chunk.cell(col, row).key_text())
            .collect();
        let key = composite_key(parts.iter().map(Option::as_deref));
        let labels = (0..group_width)
            .map(|col| chunk.cell(col, row).render())
            .collect();
        let values = (0..chunk.width())
            .map(|col| {
                let cell = chunk.cell(col, row);
                if col < group_width {
                    Aggregate::Key(Value::from(cell).into_owned())
                } else {
                    Aggregate::measure(cell)
                }
            })
            .collect();

        groups.upsert(
            key,
            Group {
                labels,
                values,
                division_by_zero,
            },
        );
    }
    Ok(groups)
}
