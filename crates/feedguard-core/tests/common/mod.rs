#![allow(dead_code)]
use std::sync::Arc;

use arrow::{
    array::{ArrayRef, Float64Array, Int64Array, StringArray},
    record_batch::RecordBatch,
};
use feedguard_core::{
    rules::{ColumnValidator, RuleContext},
    utils::deadline::Deadline,
    ArrowTable, RuleOutcome,
};

pub fn strings(values: Vec<Option<&str>>) -> ArrayRef {
    Arc::new(StringArray::from(values))
}

pub fn ints(values: Vec<Option<i64>>) -> ArrayRef {
    Arc::new(Int64Array::from(values))
}

pub fn floats(values: Vec<Option<f64>>) -> ArrayRef {
    Arc::new(Float64Array::from(values))
}

fn batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
    RecordBatch::try_from_iter_with_nullable(
        columns.into_iter().map(|(name, array)| (name, array, true)),
    )
    .unwrap()
}

pub fn feed(name: &str, columns: Vec<(&str, ArrayRef)>) -> ArrowTable {
    ArrowTable::from_batch(name, batch(columns))
}

pub fn feed_in_batches(name: &str, batches: Vec<Vec<(&str, ArrayRef)>>) -> ArrowTable {
    ArrowTable::from_batches(name, batches.into_iter().map(batch).collect()).unwrap()
}

pub fn ctx() -> RuleContext {
    RuleContext::new(10, Deadline::unbounded())
}

pub fn run(check: &impl ColumnValidator, table: &ArrowTable) -> RuleOutcome {
    check.validate(table, &ctx()).unwrap()
}
