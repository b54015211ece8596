//! Failure collection for row-scanning validators.
use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::{
    errors::RuleError,
    results::RuleOutcome,
    rules::RuleContext,
    tables::{RowChunk, Table},
};

/// Counts checked and failed rows of one batch, keeping the first
/// `limit` failure samples.
///
/// Failures may be filed under a category; per-category counts end up in
/// the outcome details.
#[derive(Debug, Clone)]
pub(crate) struct FailureAccumulator {
    limit: usize,
    checked: usize,
    failed: usize,
    samples: Vec<String>,
    categories: BTreeMap<&'static str, usize>,
}

impl FailureAccumulator {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            checked: 0,
            failed: 0,
            samples: Vec::new(),
            categories: BTreeMap::new(),
        }
    }

    /// Makes a category appear in the details even without failures.
    pub fn declare(&mut self, category: &'static str) {
        self.categories.entry(category).or_insert(0);
    }

    pub fn check(&mut self) {
        self.checked += 1;
    }

    /// Records a failure. The sample is only rendered while below the limit.
    pub fn fail(&mut self, category: &'static str, sample: impl FnOnce() -> String) {
        self.failed += 1;
        *self.categories.entry(category).or_insert(0) += 1;
        if self.samples.len() < self.limit {
            self.samples.push(sample());
        }
    }

    /// Appends a later batch, keeping sample order.
    pub fn merge(&mut self, other: FailureAccumulator) {
        self.checked += other.checked;
        self.failed += other.failed;
        for (category, count) in other.categories {
            *self.categories.entry(category).or_insert(0) += count;
        }
        let room = self.limit.saturating_sub(self.samples.len());
        self.samples.extend(other.samples.into_iter().take(room));
    }

    pub fn into_outcome(self) -> RuleOutcome {
        let mut outcome = RuleOutcome::new(self.checked, self.failed, self.samples);
        for (category, count) in self.categories {
            outcome.details.insert(category.to_string(), count.into());
        }
        outcome
    }
}

/// Visits every row of `columns` in parallel over batches and merges the
/// per-batch accumulators in batch order.
pub(crate) fn scan_rows<F>(
    table: &dyn Table,
    columns: &[&str],
    ctx: &RuleContext,
    categories: &[&'static str],
    visit: F,
) -> Result<FailureAccumulator, RuleError>
where
    F: Fn(&RowChunk, usize, &mut FailureAccumulator) + Send + Sync,
{
    try_scan_rows(table, columns, ctx, categories, |chunk, row, acc| {
        visit(chunk, row, acc);
        Ok(())
    })
}

/// [`scan_rows`] for visitors that can abort the scan.
pub(crate) fn try_scan_rows<F>(
    table: &dyn Table,
    columns: &[&str],
    ctx: &RuleContext,
    categories: &[&'static str],
    visit: F,
) -> Result<FailureAccumulator, RuleError>
where
    F: Fn(&RowChunk, usize, &mut FailureAccumulator) -> Result<(), RuleError> + Send + Sync,
{
    let chunks = table.row_chunks(columns)?;
    ctx.deadline.check()?;

    let partials = chunks
        .par_iter()
        .map(|chunk| {
            let mut acc = FailureAccumulator::new(ctx.sample_size);
            for row in 0..chunk.len() {
                ctx.deadline.check_every(row)?;
                visit(chunk, row, &mut acc)?;
            }
            Ok(acc)
        })
        .collect::<Result<Vec<_>, RuleError>>()?;

    let mut total = FailureAccumulator::new(ctx.sample_size);
    categories.iter().for_each(|c| total.declare(*c));
    for partial in partials {
        total.merge(partial);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_are_capped() {
        let mut acc = FailureAccumulator::new(2);
        for i in 0..5 {
            acc.check();
            acc.fail("null", || format!("row {i}"));
        }
        let outcome = acc.into_outcome();
        assert_eq!(outcome.checked, 5);
        assert_eq!(outcome.failed, 5);
        assert_eq!(outcome.samples, vec!["row 0", "row 1"]);
        assert_eq!(outcome.details["null"], 5);
    }

    #[test]
    fn test_merge_keeps_batch_order() {
        let mut first = FailureAccumulator::new(3);
        first.fail("a", || "row 0".to_string());
        let mut second = FailureAccumulator::new(3);
        second.declare("b");
        second.fail("a", || "row 7".to_string());
        second.fail("a", || "row 8".to_string());
        second.fail("a", || "row 9".to_string());

        first.merge(second);
        let outcome = first.into_outcome();
        assert_eq!(outcome.failed, 4);
        assert_eq!(outcome.samples, vec!["row 0", "row 7", "row 8"]);
        assert_eq!(outcome.details["b"], 0);
    }
}
