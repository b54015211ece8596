pub mod formatters;
pub mod utils;

use feedguard_core::{ResultSet, ValidationResult, ValidationSummary};
pub use formatters::{json::JsonFormatter, stdout::StdOutFormatter};

/// Receives the results of a validation run, in configuration order.
pub trait Reporter {
    fn on_start(&mut self, total_rules: usize);
    fn on_result(&mut self, result: &ValidationResult);
    fn on_summary(&mut self, summary: &ValidationSummary);
}

/// Feeds a whole result set through a reporter.
pub fn report<R: Reporter + ?Sized>(reporter: &mut R, results: &ResultSet) {
    reporter.on_start(results.results().len());
    for result in results.results() {
        reporter.on_result(result);
    }
    reporter.on_summary(results.summary());
}
