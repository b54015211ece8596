use feedguard_core::{ValidationResult, ValidationStatus, ValidationSummary};

use crate::{
    formatters::MAX_REPORTED_SAMPLES,
    utils::numbers::{format_numbers, format_percent},
    Reporter,
};

pub struct StdOutFormatter {
    intro: String,
}

impl StdOutFormatter {
    pub fn new(version: String) -> Self {
        Self {
            intro: format!("FeedGuard v{} - Data Quality Report", version),
        }
    }

    pub fn header(&self, total_rules: usize) -> String {
        format!(
            "{}\n{}\nRunning {} rules...",
            self.intro,
            "=".repeat(self.intro.len()),
            format_numbers(total_rules)
        )
    }

    pub fn result_block(&self, result: &ValidationResult) -> String {
        let status = match result.status() {
            ValidationStatus::Completed => "PASSED",
            ValidationStatus::Failed => "FAILED",
            ValidationStatus::Error => "ERROR",
        };
        let mut block = format!(
            "\n{} [{}] - {}\n  checked {}, failed {} in {} ms",
            result.rule_id(),
            result.validation_type(),
            status,
            format_numbers(result.total_records_checked()),
            format_numbers(result.failed_record_count()),
            result.elapsed_ms()
        );
        for sample in result.error_samples().iter().take(MAX_REPORTED_SAMPLES) {
            block.push_str("\n    ");
            block.push_str(sample);
        }
        let hidden = result
            .error_samples()
            .len()
            .saturating_sub(MAX_REPORTED_SAMPLES);
        if hidden > 0 {
            block.push_str(&format!("\n    ... {} more", hidden));
        }
        block
    }

    pub fn summary_block(&self, summary: &ValidationSummary) -> String {
        format!(
            "\n===================================\nResult: {} failed ({} errors), {} passed - {} success",
            summary.failed_validations,
            summary.errored_validations,
            summary.passed_validations,
            format_percent(summary.success_rate)
        )
    }
}

impl Reporter for StdOutFormatter {
    fn on_start(&mut self, total_rules: usize) {
        println!("{}", self.header(total_rules));
    }

    fn on_result(&mut self, result: &ValidationResult) {
        println!("{}", self.result_block(result));
    }

    fn on_summary(&mut self, summary: &ValidationSummary) {
        println!("{}", self.summary_block(summary));
    }
}
