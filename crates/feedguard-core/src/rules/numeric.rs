use crate::{
    config::{ChecksumAlgorithm, RangeSpec, ScalarValue},
    errors::RuleError,
    results::RuleOutcome,
    rules::{scan_rows, ColumnValidator, RuleContext},
    tables::Table,
    utils::hasher::RowDigest,
};

const OUT_OF_RANGE: &str = "out_of_range";
const NON_NUMERIC: &str = "non_numeric";

/// Relative tolerance when comparing float sums.
const SUM_EPSILON: f64 = 1e-9;

/// Numeric bounds check. Nulls are skipped; values that are not numbers
/// fail under their own category.
#[derive(Debug, Clone)]
pub struct RangeCheck {
    column: String,
    range: RangeSpec,
}

impl RangeCheck {
    pub fn new(column: String, range: RangeSpec) -> Self {
        Self { column, range }
    }
}

impl ColumnValidator for RangeCheck {
    fn name(&self) -> String {
        format!("RangeCheck{}", self.range)
    }

    fn validation_type(&self) -> &'static str {
        "range_check"
    }

    fn validate(&self, table: &dyn Table, ctx: &RuleContext) -> Result<RuleOutcome, RuleError> {
        let categories = [OUT_OF_RANGE, NON_NUMERIC];
        let acc = scan_rows(table, &[self.column.as_str()], ctx, &categories, |chunk, row, acc| {
            let cell = chunk.cell(0, row);
            if cell.is_null() {
                return;
            }
            acc.check();
            match cell.as_f64() {
                Some(v) if self.range.contains(v) => {}
                Some(v) => acc.fail(OUT_OF_RANGE, || {
                    format!(
                        "row {}: value {} out of range {}",
                        chunk.row_index(row),
                        v,
                        self.range
                    )
                }),
                None => acc.fail(NON_NUMERIC, || {
                    format!("row {}: non-numeric value '{}'", chunk.row_index(row), cell)
                }),
            }
        })?;
        Ok(acc.into_outcome())
    }
}

/// Column checksum, either the numeric sum or an xxh3 digest of the
/// rendered values in row order. Produces a single outcome.
#[derive(Debug, Clone)]
pub struct ChecksumCheck {
    column: String,
    algorithm: ChecksumAlgorithm,
    expected: Option<ScalarValue>,
}

impl ChecksumCheck {
    pub fn new(column: String, algorithm: ChecksumAlgorithm, expected: Option<ScalarValue>) -> Self {
        Self {
            column,
            algorithm,
            expected,
        }
    }

    fn digest(&self, table: &dyn Table, ctx: &RuleContext) -> Result<String, RuleError> {
        let mut digest = RowDigest::new();
        for chunk in table.row_chunks(&[self.column.as_str()])? {
            for row in 0..chunk.len() {
                ctx.deadline.check_every(row)?;
                digest.update(&chunk.cell(0, row).render());
            }
        }
        Ok(digest.hex_digest())
    }

    fn matches(&self, computed: &str, sum: Option<f64>) -> bool {
        let Some(expected) = &self.expected else {
            return true;
        };
        match (self.algorithm, sum) {
            (ChecksumAlgorithm::Sum, Some(actual)) => expected.as_f64().is_some_and(|e| {
                (actual - e).abs() <= SUM_EPSILON * e.abs().max(1.0)
            }),
            _ => expected.to_string().trim().eq_ignore_ascii_case(computed),
        }
    }
}

impl ColumnValidator for ChecksumCheck {
    fn name(&self) -> String {
        "ChecksumCheck".to_string()
    }

    fn validation_type(&self) -> &'static str {
        "checksum_check"
    }

    fn validate(&self, table: &dyn Table, ctx: &RuleContext) -> Result<RuleOutcome, RuleError> {
        ctx.deadline.check()?;
        let (computed, sum, algorithm) = match self.algorithm {
            ChecksumAlgorithm::Sum => {
                let sum = table.sum(&self.column)?;
                (sum.total.to_string(), Some(sum), "sum")
            }
            ChecksumAlgorithm::Xxh3 => (self.digest(table, ctx)?, None, "xxh3"),
        };
        ctx.deadline.check()?;

        let passed = self.matches(&computed, sum.map(|s| s.total));
        let samples = if passed {
            vec![]
        } else {
            vec![format!(
                "checksum mismatch: expected {}, actual {}",
                self.expected
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_default(),
                computed
            )]
        };
        let mut outcome = RuleOutcome::new(1, usize::from(!passed), samples)
            .with_detail("algorithm", algorithm)
            .with_detail("computed_checksum", computed);
        if let Some(expected) = &self.expected {
            outcome = outcome.with_detail("expected_checksum", expected.to_string());
        }
        if let Some(sum) = sum {
            // Values that do not read as numbers are left out of the sum.
            outcome = outcome.with_detail(NON_NUMERIC, sum.non_numeric);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::RangeScope,
        tables::fixtures::{feed, floats, ints, strings},
        utils::deadline::Deadline,
    };

    fn ctx() -> RuleContext {
        RuleContext::new(10, Deadline::unbounded())
    }

    fn age_range(scope: RangeScope) -> RangeCheck {
        RangeCheck::new(
            "age".into(),
            RangeSpec {
                bottom: 0.0,
                top: 120.0,
                scope,
            },
        )
    }

    #[test]
    fn test_inclusive_bounds() {
        let table = feed(
            "f",
            vec![("age", ints(vec![Some(0), Some(120), Some(-1), Some(121), None]))],
        );
        let outcome = age_range(RangeScope::Inclusive)
            .validate(&table, &ctx())
            .unwrap();
        assert_eq!(outcome.checked, 4);
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.samples[0], "row 2: value -1 out of range [0, 120]");
        assert_eq!(outcome.details["out_of_range"], 2);
        assert_eq!(outcome.details["non_numeric"], 0);
    }

    #[test]
    fn test_exclusive_bounds() {
        let table = feed("f", vec![("age", floats(vec![Some(0.0), Some(60.5), Some(120.0)]))]);
        let outcome = age_range(RangeScope::Exclusive)
            .validate(&table, &ctx())
            .unwrap();
        assert_eq!(outcome.failed, 2);
    }

    #[test]
    fn test_non_numeric_reported_apart() {
        let table = feed(
            "f",
            vec![("age", strings(vec![Some("25"), Some("abc"), Some("150")]))],
        );
        let outcome = age_range(RangeScope::Inclusive)
            .validate(&table, &ctx())
            .unwrap();
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.details["non_numeric"], 1);
        assert_eq!(outcome.details["out_of_range"], 1);
        assert!(outcome.samples.contains(&"row 1: non-numeric value 'abc'".to_string()));
    }

    #[test]
    fn test_sum_checksum() {
        let table = feed("f", vec![("amount", ints(vec![Some(100), Some(200), None]))]);
        let check = ChecksumCheck::new(
            "amount".into(),
            ChecksumAlgorithm::Sum,
            Some(ScalarValue::Int(300)),
        );
        let outcome = check.validate(&table, &ctx()).unwrap();
        assert_eq!((outcome.checked, outcome.failed), (1, 0));
        assert_eq!(outcome.details["computed_checksum"], "300");

        let check = ChecksumCheck::new(
            "amount".into(),
            ChecksumAlgorithm::Sum,
            Some(ScalarValue::Str("301".into())),
        );
        let outcome = check.validate(&table, &ctx()).unwrap();
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.samples, vec!["checksum mismatch: expected 301, actual 300"]);
        assert_eq!(outcome.details["non_numeric"], 0);
    }

    #[test]
    fn test_sum_checksum_counts_skipped_values() {
        let table = feed(
            "f",
            vec![("amount", strings(vec![Some("100"), Some("n/a"), None, Some("2.5")]))],
        );
        let check = ChecksumCheck::new(
            "amount".into(),
            ChecksumAlgorithm::Sum,
            Some(ScalarValue::Float(102.5)),
        );
        let outcome = check.validate(&table, &ctx()).unwrap();
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.details["computed_checksum"], "102.5");
        assert_eq!(outcome.details["non_numeric"], 1);
    }

    #[test]
    fn test_checksum_without_expected_reports_value() {
        let table = feed("f", vec![("id", strings(vec![Some("a"), Some("b")]))]);
        let check = ChecksumCheck::new("id".into(), ChecksumAlgorithm::Xxh3, None);
        let outcome = check.validate(&table, &ctx()).unwrap();
        assert_eq!(outcome.failed, 0);
        let computed = outcome.details["computed_checksum"].as_str().unwrap().to_string();
        assert_eq!(computed.len(), 16);
        assert!(outcome.details.get("non_numeric").is_none());

        let check = ChecksumCheck::new(
            "id".into(),
            ChecksumAlgorithm::Xxh3,
            Some(ScalarValue::Str(computed.to_uppercase())),
        );
        assert_eq!(check.validate(&table, &ctx()).unwrap().failed, 0);
    }
}
