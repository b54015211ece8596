use std::collections::BTreeMap;

use chrono::{DateTime, Local, Utc};
use feedguard_core::{ValidationResult, ValidationStatus, ValidationSummary};
use serde::{Deserialize, Serialize};
use serde_json::{Error, Map, Value};

use crate::{formatters::MAX_REPORTED_SAMPLES, Reporter};

/// Report document with a `summary` and one `detailed_results` entry per
/// rule, ready for an external renderer.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonFormatter {
    version: String,
    generated: String,
    summary: ValidationSummary,
    status_counts: BTreeMap<String, usize>,
    detailed_results: Vec<DetailedResult>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DetailedResult {
    rule_id: String,
    validation_type: String,
    status: ValidationStatus,
    timestamp: DateTime<Utc>,
    total_records_checked: usize,
    failed_record_count: usize,
    details: Map<String, Value>,
    error_samples: Vec<String>,
}

impl From<&ValidationResult> for DetailedResult {
    fn from(result: &ValidationResult) -> Self {
        Self {
            rule_id: result.rule_id().to_string(),
            validation_type: result.validation_type().to_string(),
            status: result.status(),
            timestamp: result.timestamp(),
            total_records_checked: result.total_records_checked(),
            failed_record_count: result.failed_record_count(),
            details: result.details().clone(),
            error_samples: result
                .error_samples()
                .iter()
                .take(MAX_REPORTED_SAMPLES)
                .cloned()
                .collect(),
        }
    }
}

impl JsonFormatter {
    pub fn new(version: String) -> Self {
        let generated = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        Self {
            version,
            generated,
            summary: ValidationSummary::default(),
            status_counts: BTreeMap::new(),
            detailed_results: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_value(&self) -> Result<Value, Error> {
        serde_json::to_value(self)
    }
}

impl Reporter for JsonFormatter {
    fn on_start(&mut self, total_rules: usize) {
        self.detailed_results.reserve(total_rules);
    }

    fn on_result(&mut self, result: &ValidationResult) {
        let label = if result.is_passed() { "passed" } else { "failed" };
        *self.status_counts.entry(label.to_string()).or_insert(0) += 1;
        self.detailed_results.push(result.into());
    }

    fn on_summary(&mut self, summary: &ValidationSummary) {
        self.summary = *summary;
    }
}
