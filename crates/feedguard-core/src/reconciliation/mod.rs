//! Cross-feed reconciliation.
//!
//! Both feeds are filtered on the allowed dimension values, grouped by the
//! dimension tuple and the measure is summed per key. Every key must agree
//! between source and target within the tolerance.
use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use tracing::debug;

use crate::{
    config::ReconciliationRule,
    errors::{ConfigError, RuleError},
    results::RuleOutcome,
    rules::{FailureAccumulator, RuleContext},
    tables::{FeedCatalog, Table},
};

pub const VALIDATION_TYPE: &str = "reconciliation";

/// Rendered dimension tuple. Rows with a null dimension never match.
type Key = Vec<String>;

#[derive(Debug, Clone, Default)]
struct Totals {
    by_key: BTreeMap<Key, f64>,
    total: f64,
    rows: usize,
    non_numeric: usize,
}

impl Totals {
    fn merge(&mut self, other: Totals) {
        for (key, value) in other.by_key {
            *self.by_key.entry(key).or_insert(0.0) += value;
        }
        self.total += other.total;
        self.rows += other.rows;
        self.non_numeric += other.non_numeric;
    }
}

#[derive(Debug, Clone)]
pub struct CompiledReconciliation {
    rule: ReconciliationRule,
    allowed: Vec<BTreeSet<String>>,
}

impl CompiledReconciliation {
    pub fn compile(rule: ReconciliationRule) -> Result<Self, ConfigError> {
        if rule.dimensions.len() != rule.dimension_values.len() {
            return Err(ConfigError::DimensionMismatch {
                rec_id: rule.rec_id.clone(),
                dimensions: rule.dimensions.len(),
                values: rule.dimension_values.len(),
            });
        }
        if rule.measure_field.trim().is_empty() {
            return Err(ConfigError::MissingField {
                rule_id: rule.rec_id.clone(),
                field: "measure_field",
            });
        }
        if let Some(tolerance) = rule.tolerance.filter(|t| t.is_nan() || *t < 0.0) {
            return Err(ConfigError::InvalidRule {
                rule_id: rule.rec_id.clone(),
                message: format!("tolerance must be a non-negative number, got {}", tolerance),
            });
        }
        let allowed = rule.dimension_values.iter().map(|v| v.allowed()).collect();
        Ok(Self { rule, allowed })
    }

    pub fn rec_id(&self) -> &str {
        &self.rule.rec_id
    }

    pub fn rule(&self) -> &ReconciliationRule {
        &self.rule
    }

    /// The rule's own tolerance, else the run's.
    pub fn tolerance(&self, ctx: &RuleContext) -> f64 {
        self.rule.tolerance.unwrap_or(ctx.tolerance)
    }

    pub fn evaluate(&self, catalog: &FeedCatalog, ctx: &RuleContext) -> Result<RuleOutcome, RuleError> {
        let missing = [&self.rule.source_feed, &self.rule.target_feed]
            .into_iter()
            .filter(|feed| !catalog.contains(feed))
            .map(|feed| format!("feed '{}' is not available for reconciliation", feed))
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Ok(RuleOutcome::new(1, 1, missing).with_detail("missing_feed", true));
        }

        let source = self.totals(catalog.get(&self.rule.source_feed)?.as_ref(), ctx)?;
        let target = self.totals(catalog.get(&self.rule.target_feed)?.as_ref(), ctx)?;
        debug!(
            rec_id = %self.rule.rec_id,
            source_keys = source.by_key.len(),
            target_keys = target.by_key.len(),
            "Aggregated reconciliation measures"
        );

        let tolerance = self.tolerance(ctx);
        let keys: BTreeSet<&Key> = source.by_key.keys().chain(target.by_key.keys()).collect();
        let mut acc = FailureAccumulator::new(ctx.sample_size);
        acc.declare("mismatch");
        acc.declare("missing_key");
        for key in keys {
            ctx.deadline.check()?;
            acc.check();
            let label = || self.label(key);
            match (source.by_key.get(key), target.by_key.get(key)) {
                (Some(s), Some(t)) => {
                    let difference = s - t;
                    if difference.abs() > tolerance {
                        acc.fail("mismatch", || {
                            format!(
                                "key ({}): source_value={}, target_value={}, difference={}",
                                label(),
                                s,
                                t,
                                difference
                            )
                        });
                    }
                }
                (Some(s), None) => acc.fail("missing_key", || {
                    format!(
                        "key ({}): target feed has no matching key (source_value={})",
                        label(),
                        s
                    )
                }),
                (None, Some(t)) => acc.fail("missing_key", || {
                    format!(
                        "key ({}): source feed has no matching key (target_value={})",
                        label(),
                        t
                    )
                }),
                (None, None) => {}
            }
        }

        Ok(acc
            .into_outcome()
            .with_detail("source_feed", self.rule.source_feed.as_str())
            .with_detail("target_feed", self.rule.target_feed.as_str())
            .with_detail("source_total", source.total)
            .with_detail("target_total", target.total)
            .with_detail("difference", source.total - target.total)
            .with_detail("tolerance", tolerance)
            .with_detail("source_rows", source.rows)
            .with_detail("target_rows", target.rows)
            .with_detail(
                "non_numeric_measures",
                source.non_numeric + target.non_numeric,
            ))
    }

    fn label(&self, key: &Key) -> String {
        if key.is_empty() {
            return "total".to_string();
        }
        self.rule
            .dimensions
            .iter()
            .zip(key)
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Per-key sums of the measure over rows passing the dimension filter.
    fn totals(&self, table: &dyn Table, ctx: &RuleContext) -> Result<Totals, RuleError> {
        let mut columns: Vec<&str> = self.rule.dimensions.iter().map(String::as_str).collect();
        columns.push(&self.rule.measure_field);
        let measure = self.rule.dimensions.len();

        let chunks = table.row_chunks(&columns)?;
        ctx.deadline.check()?;
        let partials = chunks
            .par_iter()
            .map(|chunk| {
                let mut totals = Totals::default();
                'rows: for row in 0..chunk.len() {
                    ctx.deadline.check_every(row)?;
                    let mut key = Vec::with_capacity(measure);
                    for (col, allowed) in self.allowed.iter().enumerate() {
                        match chunk.cell(col, row).key_text() {
                            Some(value) if allowed.contains(&value) => key.push(value),
                            _ => continue 'rows,
                        }
                    }
                    let cell = chunk.cell(measure, row);
                    let value = match cell.as_f64() {
                        Some(v) => v,
                        None if cell.is_null() => 0.0,
                        None => {
                            totals.non_numeric += 1;
                            0.0
                        }
                    };
                    *totals.by_key.entry(key).or_insert(0.0) += value;
                    totals.total += value;
                    totals.rows += 1;
                }
                Ok(totals)
            })
            .collect::<Result<Vec<_>, RuleError>>()?;

        let mut totals = Totals::default();
        if self.rule.dimensions.is_empty() {
            totals.by_key.insert(Vec::new(), 0.0);
        }
        for partial in partials {
            totals.merge(partial);
        }
        Ok(totals)
    }
}

#[cfg(test)]
mod tests;
