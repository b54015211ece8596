use crate::{
    errors::RuleError,
    expr::{Bindings, EvalError, Expr, Value},
    results::RuleOutcome,
    rules::{try_scan_rows, RuleContext},
    tables::{RowChunk, Table},
};

pub(super) const VALIDATION_FAILED: &str = "validation_failed";
pub(super) const DIVISION_BY_ZERO: &str = "division_by_zero";

/// One row of a chunk seen as expression bindings.
pub(super) struct RowView<'c> {
    pub chunk: &'c RowChunk,
    pub row: usize,
}

impl Bindings for RowView<'_> {
    fn value(&self, column: usize) -> Value<'_> {
        Value::from(self.chunk.cell(column, self.row))
    }
}

/// Outcome of testing one row or group.
pub(super) enum Verdict {
    Excluded,
    Passed,
    Failed,
    DivisionByZero,
}

/// Applies the condition then the validation. Division by zero in either
/// expression is a verdict; other evaluation errors abort the rule.
pub(super) fn judge<B: Bindings + ?Sized>(
    bindings: &B,
    condition: Option<&Expr<usize>>,
    validation: &Expr<usize>,
) -> Result<Verdict, RuleError> {
    let selected = match condition.map(|c| c.eval_bool(bindings)) {
        None | Some(Ok(true)) => true,
        Some(Ok(false)) => false,
        Some(Err(EvalError::DivisionByZero)) => return Ok(Verdict::DivisionByZero),
        Some(Err(e)) => return Err(e.into()),
    };
    if !selected {
        return Ok(Verdict::Excluded);
    }
    match validation.eval_bool(bindings) {
        Ok(true) => Ok(Verdict::Passed),
        Ok(false) => Ok(Verdict::Failed),
        Err(EvalError::DivisionByZero) => Ok(Verdict::DivisionByZero),
        Err(e) => Err(e.into()),
    }
}

/// Renders `name=value` pairs of the validation's columns.
pub(super) fn describe_values<B: Bindings + ?Sized>(
    bindings: &B,
    columns: &[&str],
    validation: &Expr<usize>,
) -> String {
    validation
        .columns()
        .into_iter()
        .map(|&i| format!("{}={}", columns[i], bindings.value(i)))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(super) fn evaluate_rows(
    table: &dyn Table,
    columns: &[&str],
    condition: Option<&Expr<usize>>,
    validation: &Expr<usize>,
    ctx: &RuleContext,
) -> Result<RuleOutcome, RuleError> {
    let categories = [VALIDATION_FAILED, DIVISION_BY_ZERO];
    let acc = try_scan_rows(table, columns, ctx, &categories, |chunk, row, acc| {
        let view = RowView { chunk, row };
        match judge(&view, condition, validation)? {
            Verdict::Excluded => {}
            Verdict::Passed => acc.check(),
            Verdict::Failed => {
                acc.check();
                acc.fail(VALIDATION_FAILED, || {
                    format!(
                        "row {}: validation failed ({})",
                        chunk.row_index(row),
                        describe_values(&view, columns, validation)
                    )
                });
            }
            Verdict::DivisionByZero => {
                acc.check();
                acc.fail(DIVISION_BY_ZERO, || {
                    format!("row {}: division by zero", chunk.row_index(row))
                });
            }
        }
        Ok(())
    })?;
    Ok(acc.into_outcome().with_detail("grouped", false))
}
