use std::time::Duration;

use thiserror::Error;

use crate::expr::{EvalError, ExprError};

/// Errors raised while loading a rule document. Always fatal to the run.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read rule configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Duplicate rule id '{0}'")]
    DuplicateRuleId(String),

    #[error("Duplicate template column '{feed_name}.{column_name}'")]
    DuplicateTemplate {
        feed_name: String,
        column_name: String,
    },

    #[error("Invalid template '{feed_name}.{column_name}': {message}")]
    InvalidTemplate {
        feed_name: String,
        column_name: String,
        message: String,
    },

    #[error("Rule '{rule_id}' references unknown template column '{template_name}.{column_name}'")]
    UnknownTemplate {
        rule_id: String,
        template_name: String,
        column_name: String,
    },

    #[error("Rule '{rule_id}' references undefined pattern '{key}'")]
    UnknownPattern { rule_id: String, key: String },

    #[error("'{owner}' references undefined enumeration '{key}'")]
    UnknownEnumeration { owner: String, key: String },

    #[error("Invalid regex pattern '{key}': {source}")]
    InvalidPattern {
        key: String,
        #[source]
        source: regex::Error,
    },

    #[error("Reconciliation '{rec_id}' declares {dimensions} dimensions but {values} dimension values")]
    DimensionMismatch {
        rec_id: String,
        dimensions: usize,
        values: usize,
    },

    #[error("Rule '{rule_id}' is missing required field '{field}'")]
    MissingField { rule_id: String, field: &'static str },

    #[error("Rule '{rule_id}' has an invalid expression: {source}")]
    Expression {
        rule_id: String,
        #[source]
        source: ExprError,
    },

    #[error("Rule '{rule_id}' references column '{column}' not declared in template '{template_name}'")]
    UndeclaredColumn {
        rule_id: String,
        column: String,
        template_name: String,
    },

    #[error("Rule '{rule_id}': {message}")]
    InvalidRule { rule_id: String, message: String },

    #[error("Invalid engine settings: {0}")]
    InvalidEngine(String),
}

/// Errors raised while evaluating a single rule.
///
/// These never abort a run: the engine turns them into a result with
/// `status=error` and moves on to the next rule.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Feed '{0}' not found in catalog")]
    FeedNotFound(String),

    #[error("Column '{column}' not found in feed '{feed}'")]
    ColumnNotFound { feed: String, column: String },

    #[error("Failed to cast column '{0}' to type {1}")]
    TypeCastError(String, String),

    #[error("Arrow computation error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    #[error("Rule exceeded its timeout of {} ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Expression evaluation error: {0}")]
    Evaluation(#[from] EvalError),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
