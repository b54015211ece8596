use std::time::Instant;

use chrono::Utc;
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::{
    business::{self, CompiledBusinessRule},
    config::EngineConfig,
    errors::RuleError,
    reconciliation::{self, CompiledReconciliation},
    registry::{CompiledRule, RuleSet},
    results::{ResultSet, RuleOutcome, ValidationResult, ValidationStatus},
    rules::{ColumnValidator, RuleContext},
    tables::FeedCatalog,
    utils::deadline::Deadline,
};

/// One unit of work: a rule of any kind.
enum Job<'a> {
    Column(&'a CompiledRule),
    Business(&'a CompiledBusinessRule),
    Reconciliation(&'a CompiledReconciliation),
}

impl Job<'_> {
    fn rule_id(&self) -> &str {
        match self {
            Job::Column(rule) => rule.rule_id(),
            Job::Business(rule) => rule.rule_id(),
            Job::Reconciliation(rule) => rule.rec_id(),
        }
    }

    fn validation_type(&self) -> &'static str {
        match self {
            Job::Column(rule) => rule.check().validation_type(),
            Job::Business(_) => business::VALIDATION_TYPE,
            Job::Reconciliation(_) => reconciliation::VALIDATION_TYPE,
        }
    }

    fn run(&self, catalog: &FeedCatalog, ctx: &RuleContext) -> Result<RuleOutcome, RuleError> {
        match self {
            Job::Column(rule) => {
                let table = catalog.get(rule.feed())?;
                let outcome = rule.check().validate(table.as_ref(), ctx)?;
                Ok(match &rule.definition().description {
                    Some(description) => outcome.with_detail("description", description.as_str()),
                    None => outcome,
                })
            }
            Job::Business(rule) => {
                let table = catalog.resolve(rule.feed())?;
                rule.evaluate(table.as_ref(), ctx)
            }
            Job::Reconciliation(rule) => rule.evaluate(catalog, ctx),
        }
    }
}

/// Runs every rule of a [`RuleSet`] against the feeds of a catalog.
///
/// Rules run independently on a rayon pool; results keep configuration
/// order (validations, business rules, then reconciliations). A rule that
/// errors yields a `status=error` result and never stops the run.
pub struct ValidationEngine {
    rule_set: RuleSet,
    config: EngineConfig,
}

impl ValidationEngine {
    /// Engine using the `engine` section of the rule document.
    pub fn new(rule_set: RuleSet) -> Self {
        let config = rule_set.engine_config().clone();
        Self { rule_set, config }
    }

    /// Overrides the document's engine settings.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn rule_set(&self) -> &RuleSet {
        &self.rule_set
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn jobs(&self) -> Vec<Job<'_>> {
        self.rule_set
            .column_rules()
            .iter()
            .map(Job::Column)
            .chain(self.rule_set.business_rules().iter().map(Job::Business))
            .chain(
                self.rule_set
                    .reconciliations()
                    .iter()
                    .map(Job::Reconciliation),
            )
            .collect()
    }

    /// Evaluates every rule. Only failing to build the worker pool is an
    /// error; rule failures are reported in the results.
    #[instrument(skip_all, fields(rules = self.rule_set.len(), feeds = catalog.len()))]
    pub fn run(&self, catalog: &FeedCatalog) -> Result<ResultSet, RuleError> {
        let jobs = self.jobs();
        let started = Instant::now();

        let results: Vec<ValidationResult> = match self.config.parallelism {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()?;
                pool.install(|| jobs.par_iter().map(|job| self.execute(job, catalog)).collect())
            }
            None => jobs.par_iter().map(|job| self.execute(job, catalog)).collect(),
        };

        let result_set = ResultSet::new(results);
        let summary = result_set.summary();
        info!(
            total = summary.total_validations,
            passed = summary.passed_validations,
            failed = summary.failed_validations,
            errored = summary.errored_validations,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Validation run finished"
        );
        Ok(result_set)
    }

    fn execute(&self, job: &Job<'_>, catalog: &FeedCatalog) -> ValidationResult {
        let timestamp = Utc::now();
        let deadline = Deadline::new(self.config.rule_timeout());
        let ctx = RuleContext::new(self.config.sample_size, deadline)
            .with_tolerance(self.config.tolerance);

        let result = match job.run(catalog, &ctx) {
            Ok(outcome) => ValidationResult::from_outcome(
                job.rule_id(),
                job.validation_type(),
                outcome,
                timestamp,
                deadline.elapsed(),
            ),
            Err(e) => {
                warn!(rule_id = job.rule_id(), error = %e, "Rule evaluation failed");
                ValidationResult::from_error(
                    job.rule_id(),
                    job.validation_type(),
                    &e,
                    timestamp,
                    deadline.elapsed(),
                )
            }
        };
        if result.status() != ValidationStatus::Error {
            debug!(
                rule_id = result.rule_id(),
                status = ?result.status(),
                checked = result.total_records_checked(),
                failed = result.failed_record_count(),
                "Rule evaluated"
            );
        }
        result
    }
}
