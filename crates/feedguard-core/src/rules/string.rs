use std::collections::HashSet;

use regex::Regex;
use xxhash_rust::xxh3::xxh3_64;

use crate::{
    errors::RuleError,
    results::RuleOutcome,
    rules::{scan_rows, ColumnValidator, RuleContext},
    tables::{Cell, Table},
    utils::hasher::Xxh3Builder,
};

/// Full-match check against a named pattern.
///
/// Nulls fail unless the column is explicitly optional.
#[derive(Debug, Clone)]
pub struct PatternCheck {
    column: String,
    key: String,
    regex: Regex,
    optional: bool,
}

impl PatternCheck {
    /// `regex` must already be anchored on both ends.
    pub fn new(column: String, key: String, regex: Regex, optional: bool) -> Self {
        Self {
            column,
            key,
            regex,
            optional,
        }
    }
}

impl ColumnValidator for PatternCheck {
    fn name(&self) -> String {
        format!("PatternCheck({})", self.key)
    }

    fn validation_type(&self) -> &'static str {
        "pattern_check"
    }

    fn validate(&self, table: &dyn Table, ctx: &RuleContext) -> Result<RuleOutcome, RuleError> {
        let acc = scan_rows(table, &[self.column.as_str()], ctx, &[], |chunk, row, acc| {
            let cell = chunk.cell(0, row);
            match cell {
                Cell::Null if self.optional => {}
                Cell::Null => {
                    acc.check();
                    acc.fail("null", || format!("row {}: null value", chunk.row_index(row)));
                }
                Cell::Str(s) => {
                    acc.check();
                    if !self.regex.is_match(s) {
                        acc.fail("mismatch", || self.mismatch(chunk.row_index(row), s));
                    }
                }
                other => {
                    acc.check();
                    let rendered = other.render();
                    if !self.regex.is_match(&rendered) {
                        acc.fail("mismatch", || self.mismatch(chunk.row_index(row), &rendered));
                    }
                }
            }
        })?;
        Ok(acc.into_outcome().with_detail("pattern", self.key.as_str()))
    }
}

impl PatternCheck {
    fn mismatch(&self, row: usize, value: &str) -> String {
        format!(
            "row {}: value '{}' does not match pattern '{}'",
            row, value, self.key
        )
    }
}

/// Case-sensitive membership in an enumeration. Nulls are skipped.
#[derive(Debug, Clone)]
pub struct EnumerationCheck {
    column: String,
    key: String,
    members: HashSet<u64, Xxh3Builder>,
}

impl EnumerationCheck {
    pub fn new(column: String, key: String, members: Vec<String>) -> Self {
        let mut hashset = HashSet::with_hasher(Xxh3Builder);
        members.into_iter().for_each(|m| {
            let _ = hashset.insert(xxh3_64(m.as_bytes()));
        });
        Self {
            column,
            key,
            members: hashset,
        }
    }

    fn contains(&self, value: &str) -> bool {
        self.members.contains(&xxh3_64(value.as_bytes()))
    }
}

impl ColumnValidator for EnumerationCheck {
    fn name(&self) -> String {
        format!("EnumerationCheck({})", self.key)
    }

    fn validation_type(&self) -> &'static str {
        "enumeration_check"
    }

    fn validate(&self, table: &dyn Table, ctx: &RuleContext) -> Result<RuleOutcome, RuleError> {
        let acc = scan_rows(table, &[self.column.as_str()], ctx, &[], |chunk, row, acc| {
            let cell = chunk.cell(0, row);
            if cell.is_null() {
                return;
            }
            acc.check();
            let value = cell.render();
            if !self.contains(&value) {
                acc.fail("not_allowed", || {
                    format!(
                        "row {}: value '{}' not in enumeration '{}'",
                        chunk.row_index(row),
                        value,
                        self.key
                    )
                });
            }
        })?;
        Ok(acc.into_outcome().with_detail("enumeration", self.key.as_str()))
    }
}
