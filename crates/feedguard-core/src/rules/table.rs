use serde_json::Value as JsonValue;

use crate::{
    errors::RuleError,
    results::RuleOutcome,
    rules::{ColumnValidator, RuleContext},
    tables::Table,
};

/// Row count of a feed against an expected count. Single outcome.
#[derive(Debug, Clone)]
pub struct CountCheck {
    expected: u64,
}

impl CountCheck {
    pub fn new(expected: u64) -> Self {
        Self { expected }
    }
}

impl ColumnValidator for CountCheck {
    fn name(&self) -> String {
        format!("CountCheck({})", self.expected)
    }

    fn validation_type(&self) -> &'static str {
        "count_check"
    }

    fn validate(&self, table: &dyn Table, ctx: &RuleContext) -> Result<RuleOutcome, RuleError> {
        ctx.deadline.check()?;
        let actual = table.count(None)? as u64;
        let difference = i128::from(actual) - i128::from(self.expected);
        let samples = if difference == 0 {
            vec![]
        } else {
            vec![format!(
                "row count mismatch: expected {}, actual {}, difference {}",
                self.expected, actual, difference
            )]
        };
        Ok(RuleOutcome::new(1, usize::from(difference != 0), samples)
            .with_detail("expected_count", self.expected)
            .with_detail("actual_count", actual)
            .with_detail("difference", json_integer(difference)))
    }
}

fn json_integer(value: i128) -> JsonValue {
    match i64::try_from(value) {
        Ok(v) => JsonValue::from(v),
        Err(_) => JsonValue::from(value as f64),
    }
}
