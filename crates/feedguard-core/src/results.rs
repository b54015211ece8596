use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::errors::RuleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Completed,
    Failed,
    Error,
}

/// Raw outcome of a rule, before it is stamped into a [`ValidationResult`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleOutcome {
    pub checked: usize,
    pub failed: usize,
    pub samples: Vec<String>,
    pub details: Map<String, JsonValue>,
}

impl RuleOutcome {
    pub fn new(checked: usize, failed: usize, samples: Vec<String>) -> Self {
        Self {
            checked,
            failed,
            samples,
            details: Map::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Outcome of one rule. Immutable once built.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ValidationResult {
    rule_id: String,
    validation_type: String,
    status: ValidationStatus,
    timestamp: DateTime<Utc>,
    total_records_checked: usize,
    failed_record_count: usize,
    error_samples: Vec<String>,
    #[serde(default)]
    details: Map<String, JsonValue>,
    #[serde(default)]
    elapsed_ms: u64,
}

impl ValidationResult {
    /// `completed` when nothing failed, `failed` otherwise.
    pub fn from_outcome(
        rule_id: &str,
        validation_type: &str,
        outcome: RuleOutcome,
        timestamp: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        let status = if outcome.failed == 0 {
            ValidationStatus::Completed
        } else {
            ValidationStatus::Failed
        };
        Self {
            rule_id: rule_id.to_string(),
            validation_type: validation_type.to_string(),
            status,
            timestamp,
            total_records_checked: outcome.checked,
            failed_record_count: outcome.failed,
            error_samples: outcome.samples,
            details: outcome.details,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// `error` result carrying the error message as its only sample.
    pub fn from_error(
        rule_id: &str,
        validation_type: &str,
        error: &RuleError,
        timestamp: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            validation_type: validation_type.to_string(),
            status: ValidationStatus::Error,
            timestamp,
            total_records_checked: 0,
            failed_record_count: 0,
            error_samples: vec![error.to_string()],
            details: Map::new(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn rule_id(&self) -> &str {
        &self.rule_id
    }

    pub fn validation_type(&self) -> &str {
        &self.validation_type
    }

    pub fn status(&self) -> ValidationStatus {
        self.status
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn total_records_checked(&self) -> usize {
        self.total_records_checked
    }

    pub fn failed_record_count(&self) -> usize {
        self.failed_record_count
    }

    pub fn error_samples(&self) -> &[String] {
        &self.error_samples
    }

    pub fn details(&self) -> &Map<String, JsonValue> {
        &self.details
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn is_passed(&self) -> bool {
        self.status == ValidationStatus::Completed
    }

    /// Equality ignoring timing fields.
    pub fn same_outcome(&self, other: &Self) -> bool {
        self.rule_id == other.rule_id
            && self.validation_type == other.validation_type
            && self.status == other.status
            && self.total_records_checked == other.total_records_checked
            && self.failed_record_count == other.failed_record_count
            && self.error_samples == other.error_samples
            && self.details == other.details
    }
}

/// Run-level counts. `failed_validations` includes rules in error;
/// `errored_validations` breaks them out.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct ValidationSummary {
    pub total_validations: usize,
    pub passed_validations: usize,
    pub failed_validations: usize,
    pub errored_validations: usize,
    pub success_rate: f64,
}

pub fn aggregate(results: &[ValidationResult]) -> ValidationSummary {
    let total = results.len();
    let passed = results.iter().filter(|r| r.is_passed()).count();
    let errored = results
        .iter()
        .filter(|r| r.status == ValidationStatus::Error)
        .count();
    let success_rate = if total > 0 {
        (passed as f64 / total as f64) * 100.
    } else {
        0.0
    };
    ValidationSummary {
        total_validations: total,
        passed_validations: passed,
        failed_validations: total - passed,
        errored_validations: errored,
        success_rate,
    }
}

/// Ordered results of a run with their summary.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResultSet {
    results: Vec<ValidationResult>,
    summary: ValidationSummary,
}

impl ResultSet {
    pub fn new(results: Vec<ValidationResult>) -> Self {
        let summary = aggregate(&results);
        Self { results, summary }
    }

    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    pub fn summary(&self) -> &ValidationSummary {
        &self.summary
    }

    pub fn get(&self, rule_id: &str) -> Option<&ValidationResult> {
        self.results.iter().find(|r| r.rule_id == rule_id)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.is_passed())
    }

    pub fn same_outcome(&self, other: &Self) -> bool {
        self.results.len() == other.results.len()
            && self
                .results
                .iter()
                .zip(&other.results)
                .all(|(a, b)| a.same_outcome(b))
    }

    pub fn into_results(self) -> Vec<ValidationResult> {
        self.results
    }
}
