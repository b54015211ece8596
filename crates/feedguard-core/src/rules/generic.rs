use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;

use crate::{
    config::ValueType,
    errors::RuleError,
    results::RuleOutcome,
    rules::{scan_rows, ColumnValidator, FailureAccumulator, RuleContext},
    tables::{Cell, Table},
    types::{OccurrenceMap, RowIndex},
    utils::{
        date_parser::parse_date,
        hasher::{composite_key, display_key, Xxh3Builder},
    },
};

static BOOLEAN_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)(true|false|t|f|yes|no|y|n|0|1)$").expect("static regex is valid")
});

/// Fails null, empty and whitespace-only values.
#[derive(Debug, Clone)]
pub struct MandatoryCheck {
    column: String,
}

impl MandatoryCheck {
    pub fn new(column: String) -> Self {
        Self { column }
    }
}

impl ColumnValidator for MandatoryCheck {
    fn name(&self) -> String {
        "MandatoryCheck".to_string()
    }

    fn validation_type(&self) -> &'static str {
        "mandatory_check"
    }

    fn validate(&self, table: &dyn Table, ctx: &RuleContext) -> Result<RuleOutcome, RuleError> {
        let acc = scan_rows(table, &[self.column.as_str()], ctx, &[], |chunk, row, acc| {
            acc.check();
            match chunk.cell(0, row) {
                Cell::Null => acc.fail("null", || format!("row {}: null value", chunk.row_index(row))),
                cell if cell.is_blank() => acc.fail("blank", || {
                    format!("row {}: empty value", chunk.row_index(row))
                }),
                _ => {}
            }
        })?;
        Ok(acc.into_outcome())
    }
}

/// Fails values that cannot be represented in the template type without
/// loss. Nulls are skipped.
#[derive(Debug, Clone)]
pub struct TypeCheck {
    column: String,
    expected: ValueType,
}

impl TypeCheck {
    pub fn new(column: String, expected: ValueType) -> Self {
        Self { column, expected }
    }

    fn conforms(&self, cell: Cell<'_>) -> bool {
        match self.expected {
            ValueType::String => true,
            ValueType::Integer => match cell {
                Cell::Int(_) => true,
                Cell::Float(v) => float_is_integral(v),
                Cell::Str(s) => {
                    let s = s.trim();
                    s.parse::<i64>().is_ok()
                        || s.parse::<f64>().is_ok_and(float_is_integral)
                }
                Cell::Bool(_) | Cell::Null => false,
            },
            ValueType::Float => match cell {
                Cell::Int(v) => num_traits::cast::<f64, i64>(v as f64) == Some(v),
                Cell::Float(v) => v.is_finite(),
                Cell::Str(s) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
                Cell::Bool(_) | Cell::Null => false,
            },
            ValueType::Boolean => match cell {
                Cell::Bool(_) => true,
                Cell::Int(v) => v == 0 || v == 1,
                Cell::Str(s) => BOOLEAN_LITERAL.is_match(s.trim()),
                Cell::Float(_) | Cell::Null => false,
            },
            ValueType::Date => match cell {
                Cell::Str(s) => parse_date(s).is_some(),
                _ => false,
            },
        }
    }
}

/// Whole number inside the `i64` range.
fn float_is_integral(v: f64) -> bool {
    v.is_finite() && v.fract() == 0.0 && num_traits::cast::<f64, i64>(v).is_some()
}

impl ColumnValidator for TypeCheck {
    fn name(&self) -> String {
        format!("TypeCheck({})", self.expected.as_str())
    }

    fn validation_type(&self) -> &'static str {
        "type_check"
    }

    fn validate(&self, table: &dyn Table, ctx: &RuleContext) -> Result<RuleOutcome, RuleError> {
        let acc = scan_rows(table, &[self.column.as_str()], ctx, &[], |chunk, row, acc| {
            let cell = chunk.cell(0, row);
            if cell.is_null() {
                return;
            }
            acc.check();
            if !self.conforms(cell) {
                acc.fail("invalid_type", || {
                    format!(
                        "row {}: value '{}' is not a valid {}",
                        chunk.row_index(row),
                        cell,
                        self.expected.as_str()
                    )
                });
            }
        })?;
        Ok(acc
            .into_outcome()
            .with_detail("expected_type", self.expected.as_str()))
    }
}

/// Rendered key of every row, grouped by value, with row indices sorted.
///
/// Rows for which `key` returns `None` are left out.
fn occurrences<K>(
    table: &dyn Table,
    columns: &[&str],
    ctx: &RuleContext,
    key: K,
) -> Result<(usize, OccurrenceMap), RuleError>
where
    K: Fn(&[Cell<'_>]) -> Option<String> + Send + Sync,
{
    let chunks = table.row_chunks(columns)?;
    ctx.deadline.check()?;

    let map = OccurrenceMap::with_hasher(Xxh3Builder);
    let keyed = chunks
        .par_iter()
        .map(|chunk| {
            let mut keyed = 0;
            let mut cells = Vec::with_capacity(columns.len());
            for row in 0..chunk.len() {
                ctx.deadline.check_every(row)?;
                cells.clear();
                cells.extend((0..columns.len()).map(|col| chunk.cell(col, row)));
                if let Some(k) = key(&cells) {
                    map.entry(k).or_default().push(chunk.row_index(row));
                    keyed += 1;
                }
            }
            Ok(keyed)
        })
        .collect::<Result<Vec<usize>, RuleError>>()?;

    map.iter_mut().for_each(|mut entry| entry.value_mut().sort_unstable());
    Ok((keyed.iter().sum(), map))
}

/// Repeated keys with their sorted rows, ordered by first occurrence.
fn repeated(map: OccurrenceMap) -> Vec<(String, Vec<RowIndex>)> {
    let mut repeated: Vec<(String, Vec<RowIndex>)> =
        map.into_iter().filter(|(_, rows)| rows.len() > 1).collect();
    repeated.sort_unstable_by_key(|(_, rows)| rows[0]);
    repeated
}

/// Fails every occurrence of a value that appears more than once.
/// Nulls are skipped.
#[derive(Debug, Clone)]
pub struct UniqueCheck {
    column: String,
}

impl UniqueCheck {
    pub fn new(column: String) -> Self {
        Self { column }
    }
}

impl ColumnValidator for UniqueCheck {
    fn name(&self) -> String {
        "UniqueCheck".to_string()
    }

    fn validation_type(&self) -> &'static str {
        "unique_check"
    }

    fn validate(&self, table: &dyn Table, ctx: &RuleContext) -> Result<RuleOutcome, RuleError> {
        let (checked, map) = occurrences(table, &[self.column.as_str()], ctx, |cells| {
            cells[0].key_text()
        })?;
        let repeated = repeated(map);

        // Samples follow row order, not value order.
        let mut failing: BTreeMap<RowIndex, (&str, usize)> = BTreeMap::new();
        for (value, rows) in &repeated {
            for row in rows {
                failing.insert(*row, (value.as_str(), rows.len()));
            }
        }

        let mut acc = FailureAccumulator::new(ctx.sample_size);
        for (row, (value, count)) in &failing {
            acc.fail("duplicate", || {
                format!("row {row}: value '{value}' appears {count} times")
            });
        }
        let mut outcome = acc.into_outcome();
        outcome.checked = checked;
        Ok(outcome.with_detail("duplicated_values", repeated.len()))
    }
}

/// Fails rows whose key tuple already appeared on an earlier row. The first
/// occurrence passes.
#[derive(Debug, Clone)]
pub struct DuplicateCheck {
    /// `None` compares whole rows.
    key_columns: Option<Vec<String>>,
}

impl DuplicateCheck {
    pub fn new(key_columns: Option<Vec<String>>) -> Self {
        Self { key_columns }
    }
}

impl ColumnValidator for DuplicateCheck {
    fn name(&self) -> String {
        "DuplicateCheck".to_string()
    }

    fn validation_type(&self) -> &'static str {
        "duplicate_check"
    }

    fn validate(&self, table: &dyn Table, ctx: &RuleContext) -> Result<RuleOutcome, RuleError> {
        let columns = match &self.key_columns {
            Some(columns) => columns.clone(),
            None => table.column_names(),
        };
        let columns: Vec<&str> = columns.iter().map(String::as_str).collect();

        let (checked, map) = occurrences(table, &columns, ctx, |cells| {
            let parts: Vec<Option<String>> = cells.iter().map(Cell::key_text).collect();
            Some(composite_key(parts.iter().map(Option::as_deref)))
        })?;

        let repeated = repeated(map);
        let mut later: Vec<(RowIndex, RowIndex, &str)> = Vec::new();
        for (key, rows) in &repeated {
            later.extend(rows[1..].iter().map(|row| (*row, rows[0], key.as_str())));
        }
        later.sort_unstable_by_key(|(row, _, _)| *row);

        let mut acc = FailureAccumulator::new(ctx.sample_size);
        for (row, first, key) in later {
            acc.fail("duplicate", || {
                format!("row {row}: duplicate of row {first} (key: {})", display_key(key))
            });
        }
        let mut outcome = acc.into_outcome();
        outcome.checked = checked;
        Ok(outcome
            .with_detail("duplicated_keys", repeated.len())
            .with_detail("key_columns", columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        tables::fixtures::{feed, feed_in_batches, floats, ints, strings},
        utils::deadline::Deadline,
    };
    use arrow::array::{ArrayRef, TimestampSecondArray};
    use std::{sync::Arc, time::Duration};

    fn ctx() -> RuleContext {
        RuleContext::new(10, Deadline::unbounded())
    }

    #[test]
    fn test_mandatory_counts_null_and_blank() {
        let table = feed(
            "f",
            vec![("c", strings(vec![Some("a"), Some(""), Some("b"), None]))],
        );
        let outcome = MandatoryCheck::new("c".into())
            .validate(&table, &ctx())
            .unwrap();
        assert_eq!(outcome.checked, 4);
        assert_eq!(outcome.failed, 2);
        assert_eq!(
            outcome.samples,
            vec!["row 1: empty value", "row 3: null value"]
        );
    }

    #[test]
    fn test_mandatory_whitespace_is_empty() {
        let table = feed("f", vec![("c", strings(vec![Some("  \t"), Some("x")]))]);
        let outcome = MandatoryCheck::new("c".into())
            .validate(&table, &ctx())
            .unwrap();
        assert_eq!(outcome.failed, 1);
    }

    #[test]
    fn test_missing_column_errors() {
        let table = feed("f", vec![("c", strings(vec![Some("a")]))]);
        let err = MandatoryCheck::new("missing".into())
            .validate(&table, &ctx())
            .unwrap_err();
        assert!(matches!(err, RuleError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_zero_timeout_errors() {
        let table = feed("f", vec![("c", strings(vec![Some("a")]))]);
        let ctx = RuleContext::new(10, Deadline::new(Some(Duration::ZERO)));
        let err = MandatoryCheck::new("c".into())
            .validate(&table, &ctx)
            .unwrap_err();
        assert!(matches!(err, RuleError::Timeout(_)));
    }

    #[test]
    fn test_type_integer() {
        let table = feed(
            "f",
            vec![(
                "c",
                strings(vec![Some("12"), Some("12.5"), Some("12.0"), None, Some("x")]),
            )],
        );
        let outcome = TypeCheck::new("c".into(), ValueType::Integer)
            .validate(&table, &ctx())
            .unwrap();
        assert_eq!(outcome.checked, 4);
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.samples[0], "row 1: value '12.5' is not a valid integer");

        let table = feed("f", vec![("c", floats(vec![Some(12.0), Some(12.5)]))]);
        let outcome = TypeCheck::new("c".into(), ValueType::Integer)
            .validate(&table, &ctx())
            .unwrap();
        assert_eq!(outcome.failed, 1);
    }

    #[test]
    fn test_type_boolean_and_date() {
        let table = feed(
            "f",
            vec![("c", strings(vec![Some("TRUE"), Some("no"), Some("maybe")]))],
        );
        let outcome = TypeCheck::new("c".into(), ValueType::Boolean)
            .validate(&table, &ctx())
            .unwrap();
        assert_eq!(outcome.failed, 1);

        let table = feed(
            "f",
            vec![("c", strings(vec![Some("2024-01-31"), Some("2024-02-30")]))],
        );
        let outcome = TypeCheck::new("c".into(), ValueType::Date)
            .validate(&table, &ctx())
            .unwrap();
        assert_eq!(outcome.failed, 1);
    }

    #[test]
    fn test_type_date_accepts_midnight_timestamps() {
        let midnight = 1_706_659_200; // 2024-01-31T00:00:00
        let array: ArrayRef = Arc::new(TimestampSecondArray::from(vec![
            Some(midnight),
            Some(midnight + 3600),
            None,
        ]));
        let table = feed("f", vec![("c", array)]);
        let outcome = TypeCheck::new("c".into(), ValueType::Date)
            .validate(&table, &ctx())
            .unwrap();
        assert_eq!(outcome.checked, 2);
        assert_eq!(outcome.failed, 1);
        assert!(outcome.samples[0].starts_with("row 1:"));
    }

    #[test]
    fn test_unique_fails_all_occurrences() {
        let table = feed_in_batches(
            "f",
            vec![
                vec![("id", strings(vec![Some("C001"), Some("C002"), None]))],
                vec![("id", strings(vec![Some("C003"), Some("C002"), None]))],
            ],
        );
        let outcome = UniqueCheck::new("id".into())
            .validate(&table, &ctx())
            .unwrap();
        assert_eq!(outcome.checked, 4);
        assert_eq!(outcome.failed, 2);
        assert_eq!(
            outcome.samples,
            vec![
                "row 1: value 'C002' appears 2 times",
                "row 4: value 'C002' appears 2 times"
            ]
        );
        assert_eq!(outcome.details["duplicated_values"], 1);
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let table = feed(
            "f",
            vec![
                ("a", ints(vec![Some(1), Some(1), Some(1), Some(2)])),
                ("b", strings(vec![Some("x"), Some("x"), Some("x"), Some("x")])),
            ],
        );
        let outcome = DuplicateCheck::new(Some(vec!["a".into(), "b".into()]))
            .validate(&table, &ctx())
            .unwrap();
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.samples[0], "row 1: duplicate of row 0 (key: 1, x)");

        let outcome = DuplicateCheck::new(None).validate(&table, &ctx()).unwrap();
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.details["key_columns"], serde_json::json!(["a", "b"]));
    }

    #[test]
    fn test_null_key_differs_from_null_text() {
        let table = feed(
            "f",
            vec![("a", strings(vec![None, Some("null"), None, Some("null")]))],
        );
        let outcome = DuplicateCheck::new(Some(vec!["a".into()]))
            .validate(&table, &ctx())
            .unwrap();
        assert_eq!(outcome.failed, 2);
        assert_eq!(
            outcome.samples,
            vec![
                "row 2: duplicate of row 0 (key: null)",
                "row 3: duplicate of row 1 (key: null)"
            ]
        );
        assert_eq!(outcome.details["duplicated_keys"], 2);

        let table = feed("f", vec![("a", strings(vec![None, Some("null")]))]);
        let outcome = DuplicateCheck::new(Some(vec!["a".into()]))
            .validate(&table, &ctx())
            .unwrap();
        assert_eq!(outcome.failed, 0);
    }
}
